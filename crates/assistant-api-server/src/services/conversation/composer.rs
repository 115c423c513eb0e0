use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::models::chat::{ChatMessage, Message};

use super::context_builder::ContextBuilder;
use super::fallback::fallback_response;

/// Trait for chat-completion service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Trait for retrieval service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RetrievalProvider: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalChunk>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalChunk {
    pub content: String,
    pub similarity: f32,
    pub chunk_index: usize,
}

/// Chat model created at startup, or the reason it could not be.
#[derive(Clone)]
pub enum ChatModel {
    Ready(Arc<dyn LlmProvider>),
    Unavailable(String),
}

impl ChatModel {
    pub fn provider(&self) -> Result<Arc<dyn LlmProvider>, String> {
        match self {
            ChatModel::Ready(provider) => Ok(provider.clone()),
            ChatModel::Unavailable(reason) => Err(reason.clone()),
        }
    }
}

/// One generation strategy. Tiers are tried in order; first success wins.
#[derive(Debug, Clone)]
pub enum GenerationTier {
    Rag(Vec<RetrievalChunk>),
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Rag,
    Direct,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Composition {
    pub text: String,
    pub source: AnswerSource,
}

pub struct AnswerComposer {
    retriever: Option<Arc<dyn RetrievalProvider>>,
    context_builder: Arc<ContextBuilder>,
}

impl AnswerComposer {
    pub fn new(
        retriever: Option<Arc<dyn RetrievalProvider>>,
        context_builder: Arc<ContextBuilder>,
    ) -> Self {
        Self {
            retriever,
            context_builder,
        }
    }

    pub fn rag_enabled(&self) -> bool {
        self.retriever.is_some()
    }

    /// Produce an answer for `question`. Never fails: every tier error falls
    /// through to the next one, and the last resort is the canned reply.
    pub async fn compose(
        &self,
        question: &str,
        model: &dyn LlmProvider,
        history: &[Message],
    ) -> Composition {
        let start = Instant::now();
        let tiers = self.plan(question).await;

        for tier in &tiers {
            let (source, messages) = match tier {
                GenerationTier::Rag(chunks) => (
                    AnswerSource::Rag,
                    self.context_builder
                        .build_rag_messages(chunks, history, question),
                ),
                GenerationTier::Direct => (
                    AnswerSource::Direct,
                    self.context_builder.build_direct_messages(history, question),
                ),
            };

            debug!("Trying {:?} generation with {} messages", source, messages.len());

            match model.generate(&messages).await {
                Ok(text) => {
                    info!(
                        "Answer generated via {:?} in {}ms ({} chars)",
                        source,
                        start.elapsed().as_millis(),
                        text.chars().count()
                    );
                    return Composition { text, source };
                }
                Err(e) => warn!("{:?} generation failed: {:#}", source, e),
            }
        }

        warn!("All generation tiers failed, using fallback response");
        Composition {
            text: fallback_response(question, history),
            source: AnswerSource::Fallback,
        }
    }

    /// Retrieval outcome decides the tier list: documents found gives
    /// `[Rag, Direct]`, anything else gives `[Direct]`.
    pub async fn plan(&self, question: &str) -> Vec<GenerationTier> {
        let mut tiers = Vec::with_capacity(2);

        if let Some(retriever) = &self.retriever {
            match retriever.retrieve(question).await {
                Ok(chunks) if !chunks.is_empty() => {
                    info!("Found {} relevant chunks, using RAG prompt", chunks.len());
                    tiers.push(GenerationTier::Rag(chunks));
                }
                Ok(_) => info!("No relevant documents, answering directly"),
                Err(e) => warn!("Retrieval failed, answering directly: {:#}", e),
            }
        }

        tiers.push(GenerationTier::Direct);
        tiers
    }
}
