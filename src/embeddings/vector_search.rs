// Vector store abstraction and distance metrics

use crate::types::{AppError, AppResult, EmbeddingVector};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distance metric used to rank stored chunks against a query.
///
/// Similarity is reported as `1 - distance` for both metrics. That is only a
/// true similarity for cosine distance (bounded in `[0, 2]`); for Euclidean
/// distance the threshold is applied the same way and its meaning depends on
/// the magnitude of the vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Cosine,
    Euclidean,
}

impl SearchMode {
    /// The pgvector operator computing this distance.
    pub fn operator(self) -> &'static str {
        match self {
            SearchMode::Cosine => "<=>",
            SearchMode::Euclidean => "<->",
        }
    }

    /// Distance between two vectors of equal length.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            SearchMode::Cosine => cosine_distance(a, b),
            SearchMode::Euclidean => euclidean_distance(a, b),
        }
    }

    /// Largest distance (exclusive) a record may have to satisfy `min_score`.
    pub fn max_distance(min_score: f64) -> f64 {
        1.0 - min_score
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Cosine => write!(f, "cosine"),
            SearchMode::Euclidean => write!(f, "euclidean"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(SearchMode::Cosine),
            "euclidean" | "l2" => Ok(SearchMode::Euclidean),
            other => Err(AppError::InvalidRequest(format!(
                "unknown search mode '{other}', expected 'cosine' or 'euclidean'"
            ))),
        }
    }
}

/// Cosine distance as pgvector computes it: `1 - cos(a, b)`.
/// A zero vector has no direction, so the result is NaN and never matches.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// A persisted chunk. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub document_name: String,
    pub text: String,
    pub embedding: EmbeddingVector,
}

/// One chunk ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub text: String,
    pub embedding: EmbeddingVector,
}

/// Persistent storage for `(document_name, text, embedding)` records.
///
/// Records are never updated individually: the store is either reset as a
/// whole or appended to.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Remove every stored record. Committed before returning.
    async fn reset(&self) -> AppResult<()>;

    /// Append a single record.
    async fn insert(&self, document_name: &str, text: &str, embedding: &[f32]) -> AppResult<()>;

    /// Append all `records` atomically: either every record is stored or none.
    async fn insert_batch(&self, document_name: &str, records: &[NewRecord]) -> AppResult<()>;

    /// Texts of the records closest to `query_embedding`, most similar first.
    ///
    /// Only records with `distance < 1 - min_score` qualify, and at most
    /// `top_k` are returned.
    async fn search(
        &self,
        query_embedding: &[f32],
        mode: SearchMode,
        top_k: usize,
        min_score: f64,
    ) -> AppResult<Vec<String>>;

    /// Number of stored records.
    async fn count(&self) -> AppResult<u64>;
}
