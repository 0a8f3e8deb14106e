// In-process vector store
//
// Same contract as the pgvector backend with exhaustive search over every
// record. Useful for tests and for running without a database.

use super::vector_search::{NewRecord, SearchMode, StoredRecord, VectorStore};
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use std::cmp::Ordering;
use tokio::sync::RwLock;
use tracing::debug;

pub struct InMemoryVectorStore {
    dimensions: usize,
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryVectorStore {
    /// Create an empty store whose embedding width is fixed to `dimensions`.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Snapshot of every stored record in insertion order.
    pub async fn records(&self) -> Vec<StoredRecord> {
        self.records.read().await.clone()
    }

    fn check_width(&self, embedding: &[f32]) -> AppResult<()> {
        if embedding.len() != self.dimensions {
            return Err(AppError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn reset(&self) -> AppResult<()> {
        let mut records = self.records.write().await;
        debug!(removed = records.len(), "Resetting in-memory vector store");
        records.clear();
        Ok(())
    }

    async fn insert(&self, document_name: &str, text: &str, embedding: &[f32]) -> AppResult<()> {
        self.check_width(embedding)?;
        self.records.write().await.push(StoredRecord {
            document_name: document_name.to_string(),
            text: text.to_string(),
            embedding: embedding.to_vec(),
        });
        Ok(())
    }

    async fn insert_batch(&self, document_name: &str, batch: &[NewRecord]) -> AppResult<()> {
        // Validate everything before touching the store so a bad record
        // leaves it unchanged.
        for record in batch {
            self.check_width(&record.embedding)?;
        }

        let mut records = self.records.write().await;
        records.extend(batch.iter().map(|record| StoredRecord {
            document_name: document_name.to_string(),
            text: record.text.clone(),
            embedding: record.embedding.clone(),
        }));
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        mode: SearchMode,
        top_k: usize,
        min_score: f64,
    ) -> AppResult<Vec<String>> {
        self.check_width(query_embedding)?;
        let max_distance = SearchMode::max_distance(min_score);

        let records = self.records.read().await;
        let mut scored: Vec<(f64, &StoredRecord)> = records
            .iter()
            .map(|record| (mode.distance(&record.embedding, query_embedding), record))
            .filter(|(distance, _)| *distance < max_distance)
            .collect();

        // NaN distances were rejected by the filter above.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, record)| record.text.clone())
            .collect())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.records.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new(2);
        store.insert("doc.txt", "east", &[1.0, 0.0]).await.unwrap();
        store.insert("doc.txt", "north-east", &[1.0, 1.0]).await.unwrap();
        store.insert("doc.txt", "north", &[0.0, 1.0]).await.unwrap();
        store.insert("doc.txt", "west", &[-1.0, 0.0]).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_cosine_ordering_and_threshold() {
        let store = seeded().await;

        // cos distance to [1, 0.1]: east ~0.005, north-east ~0.23, north ~0.90, west ~1.99
        let results = store
            .search(&[1.0, 0.1], SearchMode::Cosine, 10, 0.5)
            .await
            .unwrap();
        assert_eq!(results, vec!["east", "north-east"]);

        let results = store
            .search(&[1.0, 0.1], SearchMode::Cosine, 10, -1.5)
            .await
            .unwrap();
        assert_eq!(results, vec!["east", "north-east", "north", "west"]);
    }

    #[tokio::test]
    async fn test_top_k_truncates_after_ordering() {
        let store = seeded().await;
        let results = store
            .search(&[1.0, 0.1], SearchMode::Cosine, 1, -1.5)
            .await
            .unwrap();
        assert_eq!(results, vec!["east"]);

        let results = store
            .search(&[1.0, 0.1], SearchMode::Cosine, 0, -1.5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_euclidean_threshold_uses_raw_distance() {
        let store = seeded().await;

        // Euclidean distances to [1, 0]: east 0, north-east 1, north ~1.41, west 2
        let results = store
            .search(&[1.0, 0.0], SearchMode::Euclidean, 10, 0.5)
            .await
            .unwrap();
        assert_eq!(results, vec!["east"]);

        let results = store
            .search(&[1.0, 0.0], SearchMode::Euclidean, 10, -0.5)
            .await
            .unwrap();
        assert_eq!(results, vec!["east", "north-east", "north"]);
    }

    #[tokio::test]
    async fn test_exact_embedding_comes_first() {
        let store = seeded().await;
        for (text, embedding) in [("north", [0.0f32, 1.0]), ("west", [-1.0, 0.0])] {
            let results = store
                .search(&embedding, SearchMode::Cosine, 1, 0.999)
                .await
                .unwrap();
            assert_eq!(results, vec![text]);
        }
    }

    #[tokio::test]
    async fn test_ties_stay_contiguous() {
        let store = InMemoryVectorStore::new(2);
        store.insert("doc", "far", &[0.0, 1.0]).await.unwrap();
        store.insert("doc", "same-a", &[2.0, 0.0]).await.unwrap();
        store.insert("doc", "near", &[1.0, 0.2]).await.unwrap();
        store.insert("doc", "same-b", &[5.0, 0.0]).await.unwrap();

        let results = store
            .search(&[1.0, 0.0], SearchMode::Cosine, 10, -0.5)
            .await
            .unwrap();
        assert_eq!(results.len(), 4);
        let mut tied = vec![results[0].as_str(), results[1].as_str()];
        tied.sort_unstable();
        assert_eq!(tied, vec!["same-a", "same-b"]);
        assert_eq!(&results[2..], &["near".to_string(), "far".to_string()]);
    }

    #[tokio::test]
    async fn test_reset_then_search_is_empty() {
        let store = seeded().await;
        store.reset().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        let results = store
            .search(&[1.0, 0.0], SearchMode::Cosine, 5, -1.5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = InMemoryVectorStore::new(3);
        let err = store.insert("doc", "text", &[1.0, 2.0]).await.unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { expected: 3, actual: 2 }));
        assert!(err.is_persistence());
    }

    #[tokio::test]
    async fn test_insert_batch_is_all_or_nothing() {
        let store = InMemoryVectorStore::new(2);
        let batch = vec![
            NewRecord { text: "ok".to_string(), embedding: vec![1.0, 0.0] },
            NewRecord { text: "bad".to_string(), embedding: vec![1.0] },
        ];
        assert!(store.insert_batch("doc", &batch).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);

        store.insert_batch("doc", &batch[..1]).await.unwrap();
        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document_name, "doc");
        assert_eq!(records[0].text, "ok");
    }
}
