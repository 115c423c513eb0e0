pub mod config;
pub mod document;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};

use config::Settings;
use state::AppState;

pub fn build_router(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/api/chat", post(handlers::chat::chat_handler))
        .route(
            "/api/chat/stream",
            post(handlers::chat::chat_stream_post).get(handlers::chat::chat_stream_get),
        )
        .route(
            "/api/history/{conversation_id}",
            get(handlers::history::history_handler),
        )
        .route(
            "/api/chat/multimodal",
            post(handlers::multimodal::multimodal_handler),
        )
        .route(
            "/api/chat/multimodal-json",
            post(handlers::multimodal::multimodal_json_handler),
        )
        .route("/api/text2image", post(handlers::image::text2image_handler))
        .nest_service(
            settings.storage.mount_path(),
            ServeDir::new(&settings.storage.upload_dir),
        )
        .with_state(state)
        .layer(CatchPanicLayer::new())
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        // Body limit (image uploads)
        .layer(DefaultBodyLimit::max(settings.server.body_limit_bytes))
}
