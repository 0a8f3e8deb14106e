use crate::embeddings::{IngestOptions, SearchOptions};
use crate::types::{AppError, AppResult};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub ingest: IngestOptions,
    pub search: SearchOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub table: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5433,
            database: "vectordb".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            table: "vectors".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
    pub timeout_secs: u64,
}

impl EmbeddingsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Keeps the API key out of log lines.
impl std::fmt::Debug for EmbeddingsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingsConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://ai-proxy.lab.epam.com".to_string(),
            deployment: "text-embedding-3-small-1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup, falling back to
    /// defaults for every key that is absent.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = DatabaseConfig::default();
        let emb = EmbeddingsConfig::default();
        let ingest = IngestOptions::default();
        let search = SearchOptions::default();

        Ok(Self {
            database: DatabaseConfig {
                host: lookup("PGHOST").unwrap_or(db.host),
                port: parse_or(&lookup, "PGPORT", db.port)?,
                database: lookup("PGDATABASE").unwrap_or(db.database),
                user: lookup("PGUSER").unwrap_or(db.user),
                password: lookup("PGPASSWORD").unwrap_or(db.password),
                table: lookup("RAG_TABLE").unwrap_or(db.table),
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", db.max_connections)?,
            },
            embeddings: EmbeddingsConfig {
                api_key: lookup("EMBEDDINGS_API_KEY").unwrap_or(emb.api_key),
                endpoint: lookup("EMBEDDINGS_ENDPOINT").unwrap_or(emb.endpoint),
                deployment: lookup("EMBEDDINGS_DEPLOYMENT").unwrap_or(emb.deployment),
                timeout_secs: parse_or(&lookup, "EMBEDDINGS_TIMEOUT_SECS", emb.timeout_secs)?,
            },
            ingest: IngestOptions {
                chunk_size: parse_or(&lookup, "RAG_CHUNK_SIZE", ingest.chunk_size)?,
                overlap: parse_or(&lookup, "RAG_OVERLAP", ingest.overlap)?,
                dimensions: parse_or(&lookup, "RAG_DIMENSIONS", ingest.dimensions)?,
                truncate_table: parse_or(&lookup, "RAG_TRUNCATE", ingest.truncate_table)?,
            },
            search: SearchOptions {
                mode: parse_or(&lookup, "RAG_SEARCH_MODE", search.mode)?,
                top_k: parse_or(&lookup, "RAG_TOP_K", search.top_k)?,
                min_score: parse_or(&lookup, "RAG_MIN_SCORE", search.min_score)?,
                dimensions: parse_or(&lookup, "RAG_DIMENSIONS", search.dimensions)?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Configuration(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}
