use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::models::chat::HistoryResponse;
use crate::services::conversation::ConversationStore;
use crate::utils::error::ApiError;

/// Read-only; unknown ids are not created.
pub async fn history_handler(
    State(store): State<Arc<dyn ConversationStore>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = store
        .messages(&conversation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conversation not found".to_string()))?;

    debug!("History for {}: {} messages", conversation_id, history.len());

    Ok(Json(HistoryResponse {
        history,
        conversation_id,
    }))
}
