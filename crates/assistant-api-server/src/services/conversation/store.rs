use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::chat::{ConversationId, Message};

/// Storage seam for conversation history.
///
/// Each call is atomic on its own; a user/assistant pair is two separate
/// appends, so concurrent requests on one id may interleave.
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create an empty record if `id` is unknown. Returns `true` when created.
    async fn ensure(&self, id: &str) -> Result<bool>;

    /// Snapshot of the record's messages, `None` for unknown ids.
    async fn messages(&self, id: &str) -> Result<Option<Vec<Message>>>;

    /// Append to the record, creating it if needed.
    async fn append(&self, id: &str, message: Message) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl ConversationRecord {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Process-wide in-memory store. Records are never evicted.
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    storage: Arc<DashMap<ConversationId, ConversationRecord>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        info!("Initializing in-memory conversation store");
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn ensure(&self, id: &str) -> Result<bool> {
        if self.storage.contains_key(id) {
            return Ok(false);
        }

        let mut created = false;
        self.storage.entry(id.to_string()).or_insert_with(|| {
            created = true;
            ConversationRecord::new()
        });

        if created {
            info!("Created conversation {}", id);
        }
        Ok(created)
    }

    async fn messages(&self, id: &str) -> Result<Option<Vec<Message>>> {
        Ok(self.storage.get(id).map(|record| record.messages.clone()))
    }

    async fn append(&self, id: &str, message: Message) -> Result<()> {
        let mut record = self
            .storage
            .entry(id.to_string())
            .or_insert_with(ConversationRecord::new);
        record.messages.push(message);
        debug!(
            "Conversation {} now has {} messages",
            id,
            record.messages.len()
        );
        Ok(())
    }
}
