use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use super::store::ConversationStore;
use crate::models::chat::ConversationId;

pub const CONVERSATION_ID_QUERY: &str = "conversation_id";
pub const CONVERSATION_ID_HEADER: &str = "X-Conversation-ID";

/// Timestamp based id (`<unix secs>.<micros>`). Uniqueness is not checked.
pub fn generate_conversation_id() -> ConversationId {
    let now = Utc::now();
    format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
}

/// Pick the id by precedence: query param, then header, then a fresh one.
pub fn discover_conversation_id(query: Option<&str>, header: Option<&str>) -> ConversationId {
    query
        .filter(|id| !id.is_empty())
        .or_else(|| header.filter(|id| !id.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(generate_conversation_id)
}

/// Discover the id and make sure the store has a record for it.
pub async fn resolve_conversation(
    store: &dyn ConversationStore,
    query: Option<&str>,
    header: Option<&str>,
) -> Result<ConversationId> {
    let id = discover_conversation_id(query, header);
    if store.ensure(&id).await? {
        debug!("New conversation {}", id);
    }
    Ok(id)
}
