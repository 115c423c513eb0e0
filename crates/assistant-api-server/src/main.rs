use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use assistant_api_server::build_router;
use assistant_api_server::config::Settings;
use assistant_api_server::services::conversation::{
    AnswerComposer, ChatModel, ContextBuilder, InMemoryConversationStore, RetrievalProvider,
};
use assistant_api_server::services::{
    EmbeddingService, ImageGenerator, ImageService, ImageStorage, LlmService, RagService,
    VisionProvider,
};
use assistant_api_server::state::AppState;
use assistant_api_server::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_logger()?;

    info!("🚀 Starting AI medical assistant API server...");

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "✅ Configuration loaded (chat model: {}, api key: {})",
        settings.llm.chat_model,
        settings.masked_api_key()
    );

    let state = build_state(&settings).await;
    info!(
        "✅ Services initialized (RAG {})",
        if state.rag_enabled() { "enabled" } else { "disabled" }
    );

    let app = build_router(state, &settings);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

/// Wire up providers. Anything that cannot be created is degraded, never fatal.
async fn build_state(settings: &Settings) -> AppState {
    let (model, vision) = match LlmService::new(settings.llm.clone()) {
        Ok(service) => {
            let service = Arc::new(service);
            let vision: Arc<dyn VisionProvider> = service.clone();
            (ChatModel::Ready(service), Some(vision))
        }
        Err(e) => {
            warn!("Chat model unavailable, answers will use fallback: {:#}", e);
            (ChatModel::Unavailable(e.to_string()), None)
        }
    };

    let api_key = settings.llm.api_key.clone().filter(|key| !key.is_empty());

    let retriever: Option<Arc<dyn RetrievalProvider>> = match &api_key {
        Some(key) => match EmbeddingService::new(
            settings.embedding.clone(),
            key.clone(),
            settings.llm.timeout_seconds,
        ) {
            Ok(embedder) => RagService::initialize(&settings.rag, Arc::new(embedder))
                .await
                .map(|rag| rag as Arc<dyn RetrievalProvider>),
            Err(e) => {
                warn!("Embedding service unavailable, RAG disabled: {:#}", e);
                None
            }
        },
        None => {
            warn!("No API key configured, RAG disabled");
            None
        }
    };

    let image_generator: Option<Arc<dyn ImageGenerator>> = api_key.and_then(|key| {
        match ImageService::new(settings.image.clone(), key, settings.llm.timeout_seconds) {
            Ok(service) => Some(Arc::new(service) as Arc<dyn ImageGenerator>),
            Err(e) => {
                warn!("Image service unavailable: {:#}", e);
                None
            }
        }
    });

    let context_builder = Arc::new(ContextBuilder::default());

    AppState {
        store: Arc::new(InMemoryConversationStore::new()),
        composer: Arc::new(AnswerComposer::new(retriever, context_builder.clone())),
        model,
        vision,
        image_generator,
        image_storage: Arc::new(ImageStorage::new(&settings.storage)),
        context_builder,
        image: settings.image.clone(),
        stream: settings.stream.clone(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
