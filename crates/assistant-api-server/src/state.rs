use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::{ImageConfig, StreamConfig};
use crate::services::conversation::{AnswerComposer, ChatModel, ContextBuilder, ConversationStore};
use crate::services::{ImageGenerator, ImageStorage, VisionProvider};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConversationStore>,
    pub composer: Arc<AnswerComposer>,
    pub model: ChatModel,
    pub vision: Option<Arc<dyn VisionProvider>>,
    pub image_generator: Option<Arc<dyn ImageGenerator>>,
    pub image_storage: Arc<ImageStorage>,
    pub context_builder: Arc<ContextBuilder>,
    pub image: ImageConfig,
    pub stream: StreamConfig,
}

impl AppState {
    pub fn rag_enabled(&self) -> bool {
        self.composer.rag_enabled()
    }
}

impl FromRef<AppState> for Arc<dyn ConversationStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}
