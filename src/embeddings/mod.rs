// Embeddings: chunking, embedding providers, vector stores and the
// ingestion/retrieval pipeline built on them.

pub mod client;
pub mod document_processor;
pub mod memory_store;
pub mod provider;
pub mod text_chunker;
pub mod vector_search;

pub use client::*;
pub use document_processor::*;
pub use memory_store::*;
pub use provider::*;
pub use text_chunker::*;
pub use vector_search::*;
