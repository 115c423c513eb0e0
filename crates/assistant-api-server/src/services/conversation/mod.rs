//! Conversation orchestration
//!
//! - In-memory conversation store behind a trait
//! - Conversation id resolution and history merge policy
//! - Tiered answer composition (RAG, direct, canned fallback)

pub mod composer;
mod context_builder;
pub mod fallback;
pub mod history;
pub mod resolver;
mod store;

pub use composer::{
    AnswerComposer, AnswerSource, ChatModel, Composition, GenerationTier, LlmProvider,
    RetrievalChunk, RetrievalProvider,
};
pub use context_builder::ContextBuilder;
pub use fallback::fallback_response;
pub use history::merge_history;
pub use resolver::{resolve_conversation, CONVERSATION_ID_HEADER, CONVERSATION_ID_QUERY};
pub use store::{ConversationRecord, ConversationStore, InMemoryConversationStore};
