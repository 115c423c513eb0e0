use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub image: ImageConfig,
    pub storage: StorageConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Max request body (image uploads), in bytes
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            body_limit_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible base url, without the `/chat/completions` suffix
    pub base_url: String,
    /// Falls back to `DASHSCOPE_API_KEY` when empty
    pub api_key: Option<String>,
    pub chat_model: String,
    pub vision_model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            api_key: None,
            chat_model: "qwen-turbo".to_string(),
            vision_model: "qwen-vl-plus".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-v1".to_string(),
            base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RagConfig {
    pub enabled: bool,
    /// Candidate knowledge files, first existing one wins
    pub knowledge_paths: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            knowledge_paths: vec!["full1.md".to_string(), "./data/full1.md".to_string()],
            chunk_size: 2000,
            chunk_overlap: 200,
            retrieval_top_k: 3,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ImageConfig {
    pub base_url: String,
    pub model: String,
    pub default_size: String,
    pub max_images: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            model: "wanx-v1".to_string(),
            default_size: "1024*1024".to_string(),
            max_images: 4,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: String,
    /// URL prefix the upload dir is served under
    pub public_prefix: String,
}

impl StorageConfig {
    /// `public_prefix` without a trailing `/`, as used for routing and URLs
    pub fn mount_path(&self) -> &str {
        self.public_prefix.trim_end_matches('/')
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            public_prefix: "/uploads".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StreamConfig {
    pub char_delay_ms: u64,
    pub prompt_char_delay_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            char_delay_ms: 10,
            prompt_char_delay_ms: 50,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("rag.knowledge_paths")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        if settings.llm.api_key.as_deref().map_or(true, str::is_empty) {
            settings.llm.api_key = std::env::var("DASHSCOPE_API_KEY")
                .ok()
                .filter(|key| !key.is_empty());
        }

        Ok(settings)
    }

    /// Key prefix safe to print in logs
    pub fn masked_api_key(&self) -> String {
        match self.llm.api_key.as_deref() {
            Some(key) => format!("{}...", key.chars().take(8).collect::<String>()),
            None => "<unset>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.llm.chat_model, "qwen-turbo");
        assert_eq!(settings.rag.chunk_size, 2000);
        assert_eq!(settings.rag.chunk_overlap, 200);
        assert_eq!(settings.rag.retrieval_top_k, 3);
        assert_eq!(settings.stream.char_delay_ms, 10);
        assert_eq!(settings.stream.prompt_char_delay_ms, 50);
    }

    #[test]
    fn test_storage_mount_path_drops_trailing_slash() {
        let storage = StorageConfig {
            public_prefix: "/uploads/".to_string(),
            ..StorageConfig::default()
        };
        assert_eq!(storage.mount_path(), "/uploads");
        assert_eq!(StorageConfig::default().mount_path(), "/uploads");
    }

    #[test]
    fn test_masked_api_key() {
        let mut settings = Settings::default();
        assert_eq!(settings.masked_api_key(), "<unset>");

        settings.llm.api_key = Some("sk-1234567890abcdef".to_string());
        assert_eq!(settings.masked_api_key(), "sk-12345...");
    }
}
