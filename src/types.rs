// Type definitions and error taxonomy

use std::collections::HashMap;

/// A fixed-length embedding for one piece of text.
pub type EmbeddingVector = Vec<f32>;

/// Embedding provider output, keyed by the 0-based position of each input.
pub type EmbeddingBatch = HashMap<usize, EmbeddingVector>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Embedding batch incomplete: missing vector for chunk {index} of {expected}")]
    MissingEmbedding { index: usize, expected: usize },

    #[error("Ingestion of {document} failed: {source}")]
    Ingestion {
        document: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Embedding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AppError {
    /// Wrap a failure that happened while ingesting `document`.
    pub fn ingestion(document: impl Into<String>, source: AppError) -> Self {
        AppError::Ingestion {
            document: document.into(),
            source: Box::new(source),
        }
    }

    /// True for failures raised by the storage backend.
    pub fn is_persistence(&self) -> bool {
        match self {
            AppError::Persistence(_) | AppError::DimensionMismatch { .. } => true,
            AppError::Ingestion { source, .. } => source.is_persistence(),
            _ => false,
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_wraps_source() {
        let err = AppError::ingestion(
            "manual.txt",
            AppError::MissingEmbedding { index: 3, expected: 4 },
        );
        let message = err.to_string();
        assert!(message.contains("manual.txt"));
        assert!(message.contains("chunk 3 of 4"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_persistence() {
        let mismatch = AppError::DimensionMismatch { expected: 3, actual: 2 };
        assert!(mismatch.is_persistence());
        assert!(AppError::ingestion("doc", mismatch).is_persistence());
        assert!(!AppError::Configuration("missing key".to_string()).is_persistence());
    }
}
