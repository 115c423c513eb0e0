pub mod settings;

pub use settings::{
    EmbeddingConfig, ImageConfig, LlmConfig, RagConfig, ServerConfig, Settings, StorageConfig,
    StreamConfig,
};
