pub mod conversation;
pub mod embedding_service;
pub mod image_service;
pub mod image_storage;
pub mod llm_service;
pub mod rag_service;
pub mod replay;

pub use embedding_service::{EmbeddingProvider, EmbeddingService};
pub use image_service::{ImageGenerationRequest, ImageGenerator, ImageService};
pub use image_storage::{ImageError, ImageStorage, PendingImage, StoredImage};
pub use llm_service::{LlmService, VisionProvider};
pub use rag_service::RagService;
