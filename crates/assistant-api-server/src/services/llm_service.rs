use crate::config::LlmConfig;
use crate::models::chat::ChatMessage;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::conversation::LlmProvider;

/// Trait for image-understanding chat model
#[async_trait::async_trait]
pub trait VisionProvider: Send + Sync {
    async fn describe(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: usize,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completion client (DashScope compatible mode).
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
    api_key: String,
}

impl LlmService {
    /// Fails when no API key is configured or the HTTP client cannot be built.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .context("DASHSCOPE_API_KEY is not configured")?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Generate completion without streaming (wait for full response)
    pub async fn generate_chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            "Starting chat generation: model={}, messages={}",
            model,
            messages.len()
        );

        let request = ChatCompletionRequest {
            model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call LLM API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error: {} - {}", status, body);
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("No choices returned from LLM")
    }
}

#[async_trait::async_trait]
impl LlmProvider for LlmService {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.generate_chat(&self.config.chat_model, messages).await
    }
}

#[async_trait::async_trait]
impl VisionProvider for LlmService {
    async fn describe(&self, messages: &[ChatMessage]) -> Result<String> {
        self.generate_chat(&self.config.vision_model, messages).await
    }
}
