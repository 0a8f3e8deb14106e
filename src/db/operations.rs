// pgvector-backed implementation of the vector store

use crate::embeddings::{NewRecord, SearchMode, VectorStore};
use crate::types::{AppError, AppResult};
use super::table::TableName;
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::PgPool;
use tracing::{debug, info};

/// Stores chunks in a single Postgres table:
/// `(document_name TEXT, text TEXT, embedding VECTOR(n))`.
///
/// Every operation checks a connection out of the pool and returns it when
/// the statement completes; statements run in autocommit mode except
/// [`VectorStore::insert_batch`], which uses one transaction.
#[derive(Clone)]
pub struct PgVectorStore {
    pool: PgPool,
    table: TableName,
}

impl PgVectorStore {
    pub fn new(pool: PgPool, table: &str) -> AppResult<Self> {
        Ok(Self {
            pool,
            table: TableName::parse(table)?,
        })
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Create the pgvector extension and the chunk table if they are missing.
    pub async fn ensure_schema(&self, dimensions: usize) -> AppResult<()> {
        if dimensions == 0 {
            return Err(AppError::InvalidRequest(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;
        sqlx::query(&create_table_sql(&self.table, dimensions))
            .execute(&self.pool)
            .await?;

        info!(table = %self.table.qualified(), dimensions, "Vector table ready");
        Ok(())
    }
}

pub(crate) fn create_table_sql(table: &TableName, dimensions: usize) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGSERIAL PRIMARY KEY,
            document_name TEXT NOT NULL,
            text TEXT NOT NULL,
            embedding VECTOR({dimensions}) NOT NULL
        )",
        table.qualified()
    )
}

pub(crate) fn truncate_sql(table: &TableName) -> String {
    format!("TRUNCATE TABLE {}", table.qualified())
}

pub(crate) fn insert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (document_name, text, embedding) VALUES ($1, $2, $3)",
        table.qualified()
    )
}

pub(crate) fn search_sql(table: &TableName, mode: SearchMode) -> String {
    let op = mode.operator();
    format!(
        "SELECT text, embedding {op} $1 AS distance \
         FROM {} \
         WHERE embedding {op} $1 < $2 \
         ORDER BY distance ASC \
         LIMIT $3",
        table.qualified()
    )
}

pub(crate) fn count_sql(table: &TableName) -> String {
    format!("SELECT COUNT(*) FROM {}", table.qualified())
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn reset(&self) -> AppResult<()> {
        sqlx::query(&truncate_sql(&self.table))
            .execute(&self.pool)
            .await?;
        debug!(table = %self.table.qualified(), "Truncated vector table");
        Ok(())
    }

    async fn insert(&self, document_name: &str, text: &str, embedding: &[f32]) -> AppResult<()> {
        sqlx::query(&insert_sql(&self.table))
            .bind(document_name)
            .bind(text)
            .bind(Vector::from(embedding.to_vec()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_batch(&self, document_name: &str, records: &[NewRecord]) -> AppResult<()> {
        let sql = insert_sql(&self.table);
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(&sql)
                .bind(document_name)
                .bind(&record.text)
                .bind(Vector::from(record.embedding.clone()))
                .execute(&mut *tx)
                .await?;
        }
        // Dropping `tx` on an early return above rolls everything back.
        tx.commit().await?;

        debug!(document = document_name, rows = records.len(), "Inserted chunk batch");
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        mode: SearchMode,
        top_k: usize,
        min_score: f64,
    ) -> AppResult<Vec<String>> {
        let limit = i64::try_from(top_k).unwrap_or(i64::MAX);
        let rows: Vec<(String, f64)> = sqlx::query_as(&search_sql(&self.table, mode))
            .bind(Vector::from(query_embedding.to_vec()))
            .bind(SearchMode::max_distance(min_score))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(
            mode = %mode,
            matches = rows.len(),
            best_distance = ?rows.first().map(|(_, d)| *d),
            "Similarity search finished"
        );
        Ok(rows.into_iter().map(|(text, _)| text).collect())
    }

    async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(&count_sql(&self.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
