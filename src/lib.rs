// Manual RAG - chunking, pgvector persistence and similarity retrieval

pub mod cli;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use embeddings::{IngestOptions, SearchMode, SearchOptions, TextProcessor};
pub use types::{AppError, AppResult};
