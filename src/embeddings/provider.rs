use crate::types::{AppResult, EmbeddingBatch};
use async_trait::async_trait;

/// Anything that can turn a batch of texts into embedding vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `texts` with vectors of width `dimensions`.
    ///
    /// The result is keyed by the position of each input in `texts`.
    async fn embed(&self, texts: &[String], dimensions: usize) -> AppResult<EmbeddingBatch>;
}
