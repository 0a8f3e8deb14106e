// HTTP client for an OpenAI-compatible deployment-style embeddings endpoint:
//   POST {endpoint}/openai/deployments/{deployment}/embeddings
// authenticated with an `api-key` header.

use super::provider::EmbeddingProvider;
use crate::config::EmbeddingsConfig;
use crate::types::{AppError, AppResult, EmbeddingBatch};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub struct EmbeddingsClient {
    client: Client,
    url: Url,
    api_key: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingsClient {
    /// Build a client from configuration. Fails before any network I/O when
    /// the key is blank or the endpoint is not a valid URL.
    pub fn new(config: &EmbeddingsConfig) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "embeddings API key cannot be empty".to_string(),
            ));
        }
        if config.deployment.trim().is_empty() {
            return Err(AppError::Configuration(
                "embeddings deployment name cannot be empty".to_string(),
            ));
        }

        let raw = format!(
            "{}/openai/deployments/{}/embeddings",
            config.endpoint.trim_end_matches('/'),
            config.deployment.trim()
        );
        let url = Url::parse(&raw)
            .map_err(|e| AppError::Configuration(format!("invalid embeddings endpoint {raw:?}: {e}")))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            api_key: config.api_key.trim().to_string(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingsClient {
    async fn embed(&self, texts: &[String], dimensions: usize) -> AppResult<EmbeddingBatch> {
        if texts.is_empty() {
            return Ok(EmbeddingBatch::new());
        }

        debug!(inputs = texts.len(), dimensions, url = %self.url, "Requesting embeddings");
        let response = self
            .client
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&EmbeddingRequest { input: texts, dimensions })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let batch = collect_batch(parsed.data, texts.len(), dimensions)
            .map_err(|body| AppError::Provider {
                status: status.as_u16(),
                body,
            })?;

        info!(vectors = batch.len(), dimensions, "Received embeddings");
        Ok(batch)
    }
}

// Checks the response covers every input with a vector of the requested width.
fn collect_batch(
    data: Vec<EmbeddingData>,
    expected: usize,
    dimensions: usize,
) -> Result<EmbeddingBatch, String> {
    if data.len() < expected {
        return Err(format!(
            "provider returned {} embeddings for {} inputs",
            data.len(),
            expected
        ));
    }

    let mut batch = EmbeddingBatch::with_capacity(data.len());
    for item in data {
        if item.embedding.len() != dimensions {
            return Err(format!(
                "embedding {} has {} dimensions, requested {}",
                item.index,
                item.embedding.len(),
                dimensions
            ));
        }
        batch.insert(item.index, item.embedding);
    }

    if let Some(missing) = (0..expected).find(|i| !batch.contains_key(i)) {
        return Err(format!("provider response is missing index {missing}"));
    }
    Ok(batch)
}
