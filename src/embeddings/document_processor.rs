// Ingestion and retrieval orchestration

use super::provider::EmbeddingProvider;
use super::text_chunker::TextChunker;
use super::vector_search::{NewRecord, SearchMode, VectorStore};
use crate::types::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Parameters for ingesting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub dimensions: usize,
    /// Remove every stored record before ingesting.
    pub truncate_table: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            overlap: 40,
            dimensions: 1536,
            truncate_table: true,
        }
    }
}

/// Parameters for one similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub top_k: usize,
    /// Minimum similarity (`1 - distance`) a result must exceed.
    pub min_score: f64,
    pub dimensions: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Cosine,
            top_k: 5,
            min_score: 0.5,
            dimensions: 1536,
        }
    }
}

/// Summary of a finished ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_name: String,
    pub chunks: usize,
    pub truncated: bool,
}

/// Chunks, embeds and stores documents, and answers similarity queries
/// against what was stored.
///
/// A document is stored atomically: if any step after the optional reset
/// fails, none of its chunks are persisted.
pub struct TextProcessor {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl TextProcessor {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { provider, store }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Load, chunk, embed and store the text file at `path`.
    ///
    /// Chunks are tagged with the file's base name. Every failure is reported
    /// as [`AppError::Ingestion`] wrapping the underlying cause.
    pub async fn process_text_file(
        &self,
        path: impl AsRef<Path>,
        options: &IngestOptions,
    ) -> AppResult<IngestReport> {
        let path = path.as_ref();
        let document_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.ingest(path, &document_name, options)
            .await
            .map_err(|e| AppError::ingestion(&document_name, e))
    }

    async fn ingest(
        &self,
        path: &Path,
        document_name: &str,
        options: &IngestOptions,
    ) -> AppResult<IngestReport> {
        // Reject bad chunking parameters before the reset wipes the store.
        let chunker = TextChunker::new(options.chunk_size, options.overlap)?;

        if options.truncate_table {
            self.store.reset().await?;
        }

        let content = tokio::fs::read_to_string(path).await?;
        let chunks = chunker.chunk(&content);
        info!(
            document = document_name,
            characters = content.chars().count(),
            chunks = chunks.len(),
            "Chunked document"
        );

        if chunks.is_empty() {
            return Ok(IngestReport {
                document_name: document_name.to_string(),
                chunks: 0,
                truncated: options.truncate_table,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let mut embeddings = self.provider.embed(&texts, options.dimensions).await?;

        let expected = chunks.len();
        let records = chunks
            .into_iter()
            .map(|chunk| {
                let embedding = embeddings
                    .remove(&chunk.index)
                    .ok_or(AppError::MissingEmbedding { index: chunk.index, expected })?;
                Ok(NewRecord { text: chunk.text, embedding })
            })
            .collect::<AppResult<Vec<_>>>()?;

        self.store.insert_batch(document_name, &records).await?;
        info!(document = document_name, stored = records.len(), "Stored document chunks");

        Ok(IngestReport {
            document_name: document_name.to_string(),
            chunks: records.len(),
            truncated: options.truncate_table,
        })
    }

    /// Texts of the stored chunks most similar to `query`, best match first.
    /// An empty list means nothing cleared the `min_score` threshold.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> AppResult<Vec<String>> {
        let mut batch = self
            .provider
            .embed(&[query.to_string()], options.dimensions)
            .await?;
        let embedding = batch
            .remove(&0)
            .ok_or(AppError::MissingEmbedding { index: 0, expected: 1 })?;

        let results = self
            .store
            .search(&embedding, options.mode, options.top_k, options.min_score)
            .await?;
        debug!(
            mode = %options.mode,
            top_k = options.top_k,
            min_score = options.min_score,
            results = results.len(),
            "Retrieved context"
        );
        Ok(results)
    }
}
