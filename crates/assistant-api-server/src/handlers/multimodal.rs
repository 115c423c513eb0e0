use crate::models::chat::*;
use crate::services::conversation::merge_history;
use crate::services::image_storage::decode_image_data;
use crate::state::AppState;
use crate::utils::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    Json,
};
use std::time::Instant;
use tracing::{debug, info};

use super::extract::ResolvedConversation;

/// Multipart form: `message`, `file`, optional `chat_history` (JSON array).
pub async fn multimodal_handler(
    State(state): State<AppState>,
    ResolvedConversation(conversation_id): ResolvedConversation,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, ApiError> {
    let mut message = String::new();
    let mut chat_history: Vec<HistoryEntry> = Vec::new();
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "message" => {
                message = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid message: {}", e)))?;
            }
            "chat_history" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid chat_history: {}", e)))?;
                if !raw.trim().is_empty() {
                    chat_history = serde_json::from_str(&raw).map_err(|e| {
                        ApiError::BadRequest(format!("chat_history must be a JSON array: {}", e))
                    })?;
                }
            }
            "file" => {
                debug!("Receiving image {:?}", field.file_name());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                        .to_vec(),
                );
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    let image = file_data.ok_or_else(|| ApiError::BadRequest("Image file is required".to_string()))?;

    answer_with_image(&state, conversation_id, message, adapt_history(chat_history), image)
        .await
        .map(Json)
}

/// JSON body with a base64 (or `data:` url) image.
pub async fn multimodal_json_handler(
    State(state): State<AppState>,
    ResolvedConversation(conversation_id): ResolvedConversation,
    payload: Result<Json<MultimodalJsonRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let image_data = request
        .image_data
        .filter(|data| !data.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("image_data is required".to_string()))?;
    let image = decode_image_data(&image_data)?;

    answer_with_image(
        &state,
        conversation_id,
        request.message,
        adapt_history(request.chat_history),
        image,
    )
    .await
    .map(Json)
}

async fn answer_with_image(
    state: &AppState,
    conversation_id: ConversationId,
    message: String,
    client_history: Option<Vec<Message>>,
    image: Vec<u8>,
) -> Result<ChatResponse, ApiError> {
    let start_time = Instant::now();

    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }

    let vision = state
        .vision
        .clone()
        .ok_or_else(|| ApiError::Upstream("模型初始化失败: vision model unavailable".to_string()))?;

    let pending_image = state.image_storage.prepare(image)?;

    info!(
        "Multimodal request: conversation={}, message_len={}",
        conversation_id,
        message.chars().count()
    );

    let stored = state
        .store
        .messages(&conversation_id)
        .await?
        .unwrap_or_default();
    let history = merge_history(client_history, stored);

    let messages =
        state
            .context_builder
            .build_multimodal_messages(&history, pending_image.data_url(), &message);

    let answer = vision
        .describe(&messages)
        .await
        .map_err(|e| ApiError::Upstream(format!("多模态处理失败: {:#}", e)))?;

    let stored_image = pending_image.commit().await?;

    state
        .store
        .append(
            &conversation_id,
            Message::user(message).with_image_url(stored_image.public_url),
        )
        .await?;
    state
        .store
        .append(&conversation_id, Message::assistant(answer.clone()))
        .await?;

    info!(
        "Multimodal answer in {}ms ({} chars)",
        start_time.elapsed().as_millis(),
        answer.chars().count()
    );

    Ok(ChatResponse {
        response: answer,
        conversation_id,
        error: None,
    })
}
