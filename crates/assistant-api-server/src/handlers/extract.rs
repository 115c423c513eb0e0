use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use crate::models::chat::ConversationId;
use crate::services::conversation::{resolve_conversation, CONVERSATION_ID_HEADER};
use crate::state::AppState;
use crate::utils::error::ApiError;

#[derive(Debug, Default, Deserialize)]
struct ConversationQuery {
    conversation_id: Option<String>,
}

/// Conversation id from `?conversation_id=`, then `X-Conversation-ID`, else
/// freshly generated. The store has a record for it once extracted.
#[derive(Debug, Clone)]
pub struct ResolvedConversation(pub ConversationId);

impl FromRequestParts<AppState> for ResolvedConversation {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A malformed query string just means no id was given.
        let query = Query::<ConversationQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        let header = parts
            .headers
            .get(CONVERSATION_ID_HEADER)
            .and_then(|value| value.to_str().ok());

        let id = resolve_conversation(
            state.store.as_ref(),
            query.conversation_id.as_deref(),
            header,
        )
        .await?;

        Ok(Self(id))
    }
}
