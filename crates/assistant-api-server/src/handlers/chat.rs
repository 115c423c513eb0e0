use crate::models::chat::*;
use crate::services::conversation::{fallback_response, merge_history};
use crate::services::replay::{normalize_line_endings, replay_chars};
use crate::state::AppState;
use crate::utils::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::extract::ResolvedConversation;

/// Streamed when the request carries no question
pub const EMPTY_MESSAGE_PROMPT: &str = "请输入您的问题";

const STREAM_COMPLETED: &str = "Stream completed";
const STREAM_COMPLETED_WITH_FALLBACK: &str = "Stream completed with fallback";

pub async fn chat_handler(
    State(state): State<AppState>,
    ResolvedConversation(conversation_id): ResolvedConversation,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let start_time = Instant::now();

    info!(
        "Chat request: conversation={}, message_len={}, client_history={}",
        conversation_id,
        request.message.chars().count(),
        request.chat_history.len()
    );

    let client_history = adapt_history(request.chat_history);

    let model = match state.model.provider() {
        Ok(model) => model,
        Err(reason) => {
            warn!("Chat model unavailable: {}", reason);
            return Ok(Json(ChatResponse {
                response: fallback_response(
                    &request.message,
                    client_history.as_deref().unwrap_or_default(),
                ),
                conversation_id,
                error: Some(format!("模型初始化失败: {}", reason)),
            }));
        }
    };

    let stored = state
        .store
        .messages(&conversation_id)
        .await?
        .unwrap_or_default();
    let history = merge_history(client_history, stored);
    debug!("Using {} history messages", history.len());

    let composition = state
        .composer
        .compose(&request.message, model.as_ref(), &history)
        .await;

    state
        .store
        .append(&conversation_id, Message::user(request.message))
        .await?;
    state
        .store
        .append(&conversation_id, Message::assistant(composition.text.clone()))
        .await?;

    info!(
        "Chat completed in {}ms via {:?}",
        start_time.elapsed().as_millis(),
        composition.source
    );

    Ok(Json(ChatResponse {
        response: composition.text,
        conversation_id,
        error: None,
    }))
}

/// What a stream answers and whether it writes to the store.
struct StreamPlan {
    conversation_id: ConversationId,
    question: String,
    /// Client history (POST) or the stored list (GET); `None` defers to the store
    history: Option<Vec<Message>>,
    persist: bool,
}

/// POST: question and history come from the body; both turns are recorded.
pub async fn chat_stream_post(
    State(state): State<AppState>,
    ResolvedConversation(conversation_id): ResolvedConversation,
    payload: Result<Option<Json<StreamChatRequest>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
        .map(|Json(request)| request)
        .unwrap_or_default();

    info!(
        "Stream request (POST): conversation={}, message_len={}",
        conversation_id,
        request.message.chars().count()
    );

    let plan = StreamPlan {
        conversation_id,
        question: request.message,
        history: adapt_history(request.chat_history),
        persist: true,
    };

    Ok(sse_response(answer_stream(state, plan)))
}

/// GET (EventSource): re-answers the last stored user message. Never writes.
pub async fn chat_stream_get(
    State(state): State<AppState>,
    ResolvedConversation(conversation_id): ResolvedConversation,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state
        .store
        .messages(&conversation_id)
        .await?
        .unwrap_or_default();

    let question = stored
        .iter()
        .rev()
        .find(|msg| msg.is_user())
        .map(|msg| msg.content.clone())
        .unwrap_or_default();

    if question.is_empty() {
        warn!("Conversation {} has no user message to answer", conversation_id);
    }

    info!(
        "Stream request (GET): conversation={}, history={}",
        conversation_id,
        stored.len()
    );

    let plan = StreamPlan {
        conversation_id,
        question,
        history: Some(stored),
        persist: false,
    };

    Ok(sse_response(answer_stream(state, plan)))
}

fn sse_response<S>(stream: S) -> impl IntoResponse
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
}

fn answer_stream(
    state: AppState,
    plan: StreamPlan,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    async_stream::stream! {
        let StreamPlan { conversation_id, question, history, persist } = plan;
        let char_delay = Duration::from_millis(state.stream.char_delay_ms);

        if question.is_empty() {
            let prompt_delay = Duration::from_millis(state.stream.prompt_char_delay_ms);
            for await event in char_events(EMPTY_MESSAGE_PROMPT.to_string(), prompt_delay) {
                yield event;
            }
            yield Ok(done_event(STREAM_COMPLETED, &conversation_id));
            return;
        }

        let model = match state.model.provider() {
            Ok(model) => model,
            Err(reason) => {
                warn!("Chat model unavailable, streaming fallback: {}", reason);
                let fallback = normalize_line_endings(&fallback_response(
                    &question,
                    history.as_deref().unwrap_or_default(),
                ));

                for await event in char_events(fallback.clone(), char_delay) {
                    yield event;
                }
                yield Ok(done_event(STREAM_COMPLETED_WITH_FALLBACK, &conversation_id));

                if persist {
                    let recorded = async {
                        state.store.append(&conversation_id, Message::user(question)).await?;
                        state.store.append(&conversation_id, Message::assistant(fallback)).await
                    }
                    .await;
                    if let Err(e) = recorded {
                        error!("Failed to record fallback exchange: {:#}", e);
                    }
                }
                return;
            }
        };

        let stored = match state.store.messages(&conversation_id).await {
            Ok(stored) => stored.unwrap_or_default(),
            Err(e) => {
                yield Ok(error_event(&e));
                return;
            }
        };
        let history = merge_history(history, stored);
        debug!("Using {} history messages", history.len());

        let composition = state.composer.compose(&question, model.as_ref(), &history).await;
        let answer = normalize_line_endings(&composition.text);

        if persist {
            if let Err(e) = state.store.append(&conversation_id, Message::user(question)).await {
                yield Ok(error_event(&e));
                return;
            }
        }

        let char_count = answer.chars().count();
        for await event in char_events(answer.clone(), char_delay) {
            yield event;
        }
        debug!("Streamed {} chars", char_count);

        if persist {
            if let Err(e) = state.store.append(&conversation_id, Message::assistant(answer)).await {
                yield Ok(error_event(&e));
                return;
            }
        }

        yield Ok(done_event(STREAM_COMPLETED, &conversation_id));
        info!("Stream completed for conversation {}", conversation_id);
    }
}

fn char_events(
    text: String,
    delay: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    replay_chars(text, delay).map(|ch| Ok(Event::default().event("message").data(ch)))
}

fn done_event(message: &str, conversation_id: &str) -> Event {
    create_sse_event(
        "done",
        &StreamCompletion {
            message: message.to_string(),
            conversation_id: conversation_id.to_string(),
        },
    )
}

fn error_event(err: &anyhow::Error) -> Event {
    error!("Stream error: {:#}", err);
    create_sse_event(
        "error",
        &StreamError {
            error: err.to_string(),
        },
    )
}

// Helper: Create SSE event
fn create_sse_event<T: serde::Serialize>(event_type: &str, data: &T) -> Event {
    Event::default()
        .event(event_type)
        .data(serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string()))
}
