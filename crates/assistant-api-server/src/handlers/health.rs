use axum::{extract::State, Json};
use serde::Serialize;

use crate::models::chat::now_iso8601;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    message: String,
    version: String,
    rag_status: String,
    timestamp: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "AI医疗助手系统正在运行".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rag_status: if state.rag_enabled() { "enabled" } else { "disabled" }.to_string(),
        timestamp: now_iso8601(),
    })
}
