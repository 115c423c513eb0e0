use crate::config::EmbeddingConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Trait for text embedding service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    encoding_format: &'a str,
}

#[derive(Clone)]
pub struct EmbeddingService {
    client: Client,
    config: EmbeddingConfig,
    api_key: String,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig, api_key: String, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    async fn embed_internal(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for {} chars", text.chars().count());

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
            encoding_format: "float",
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to embedding server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error ({}): {}", status, body);
        }

        let json_value: Value = response
            .json()
            .await
            .context("Failed to parse embedding response as JSON")?;

        let embedding = parse_embedding(&json_value)?;
        if embedding.is_empty() {
            anyhow::bail!("Generated embedding is empty");
        }

        Ok(embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for EmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_internal(text).await
    }
}

fn as_floats(values: &[Value]) -> Vec<f32> {
    values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Accepts `{"data":[{"embedding":[..]}]}` (OpenAI), `{"embedding":[..]}`,
/// `[{"embedding":[..]}]` and a bare float array.
fn parse_embedding(json_value: &Value) -> Result<Vec<f32>> {
    if let Some(data) = json_value.get("data").and_then(Value::as_array) {
        if let Some(values) = data
            .first()
            .and_then(|item| item.get("embedding"))
            .and_then(Value::as_array)
        {
            return Ok(as_floats(values));
        }
    }

    if let Some(values) = json_value.get("embedding").and_then(Value::as_array) {
        return Ok(as_floats(values));
    }

    if let Some(arr) = json_value.as_array() {
        if arr.is_empty() {
            anyhow::bail!("Empty array returned from embedding server");
        }
        if let Some(values) = arr[0].get("embedding").and_then(Value::as_array) {
            return Ok(as_floats(values));
        }
        return Ok(as_floats(arr));
    }

    anyhow::bail!("Unrecognized embedding response format: {}", json_value)
}
