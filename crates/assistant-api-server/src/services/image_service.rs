use crate::config::ImageConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub n: u8,
    pub size: String,
}

/// Trait for text-to-image synthesis service
#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the URLs of the generated images.
    async fn generate(&self, request: &ImageGenerationRequest) -> Result<Vec<String>>;
}

#[derive(Debug, Serialize)]
struct GenerationBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    n: u8,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

#[derive(Clone)]
pub struct ImageService {
    client: Client,
    config: ImageConfig,
    api_key: String,
}

impl ImageService {
    pub fn new(config: ImageConfig, api_key: String, timeout_seconds: u64) -> Result<Self> {
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
}

#[async_trait::async_trait]
impl ImageGenerator for ImageService {
    async fn generate(&self, request: &ImageGenerationRequest) -> Result<Vec<String>> {
        debug!(
            "Image synthesis: model={}, n={}, size={}",
            self.config.model, request.n, request.size
        );

        let body = GenerationBody {
            model: &self.config.model,
            prompt: &request.prompt,
            negative_prompt: request.negative_prompt.as_deref(),
            n: request.n,
            size: &request.size,
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.config.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to call image synthesis API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Image synthesis API error: {} - {}", status, body);
        }

        let parsed: GenerationResponse = response
            .json()
            .await
            .context("Failed to parse image synthesis response")?;

        let urls = image_urls(parsed);
        if urls.is_empty() {
            anyhow::bail!("Image synthesis returned no images");
        }

        info!("Generated {} image(s)", urls.len());
        Ok(urls)
    }
}

fn image_urls(response: GenerationResponse) -> Vec<String> {
    response.data.into_iter().filter_map(|image| image.url).collect()
}
