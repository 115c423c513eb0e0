use crate::models::chat::*;
use crate::services::ImageGenerationRequest;
use crate::state::AppState;
use crate::utils::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use super::extract::ResolvedConversation;

pub async fn text2image_handler(
    State(state): State<AppState>,
    ResolvedConversation(conversation_id): ResolvedConversation,
    payload: Result<Json<TextToImageRequest>, JsonRejection>,
) -> Result<Json<TextToImageResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if request.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt is required".to_string()));
    }

    let n = request.n.unwrap_or(1);
    if n == 0 || n > state.image.max_images {
        return Err(ApiError::BadRequest(format!(
            "n must be between 1 and {}",
            state.image.max_images
        )));
    }

    let generator = state
        .image_generator
        .clone()
        .ok_or_else(|| ApiError::Upstream("模型初始化失败: image model unavailable".to_string()))?;

    let generation = ImageGenerationRequest {
        prompt: request.prompt,
        negative_prompt: request.negative_prompt.filter(|p| !p.trim().is_empty()),
        n,
        size: request
            .size
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| state.image.default_size.clone()),
    };

    info!(
        "Text-to-image request: conversation={}, n={}, size={}",
        conversation_id, generation.n, generation.size
    );

    let image_urls = generator
        .generate(&generation)
        .await
        .map_err(|e| ApiError::Upstream(format!("图像生成失败: {:#}", e)))?;

    state
        .store
        .append(&conversation_id, Message::user(generation.prompt))
        .await?;
    state
        .store
        .append(
            &conversation_id,
            Message::assistant(format!("已为您生成{}张图片", image_urls.len()))
                .with_image_urls(image_urls.clone()),
        )
        .await?;

    Ok(Json(TextToImageResponse {
        image_urls,
        conversation_id,
    }))
}
