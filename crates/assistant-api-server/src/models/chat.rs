use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub type ConversationId = String;

// ===== CONVERSATION MODELS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// A single conversation turn, as stored and as returned by `/api/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
}

impl Message {
    fn stamped(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(now_iso8601()),
            image_url: None,
            image_urls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::stamped(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::stamped(Role::Assistant, content)
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_image_urls(mut self, urls: Vec<String>) -> Self {
        self.image_urls = Some(urls);
        self
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

pub fn now_iso8601() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// History entry as sent by clients. Roles are free-form on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl HistoryEntry {
    pub fn into_message(self) -> Option<Message> {
        let Some(role) = Role::parse(&self.role) else {
            warn!("Skipping history entry with unsupported role: {:?}", self.role);
            return None;
        };

        Some(Message {
            role,
            content: self.content,
            timestamp: self.timestamp,
            image_url: self.image_url,
            image_urls: None,
        })
    }
}

/// Adapt client-supplied history into canonical messages.
///
/// `None` only when the client sent no entries. A history made entirely of
/// unsupported roles is still `Some` (and empty), so it still overrides the
/// stored history.
pub fn adapt_history(entries: Vec<HistoryEntry>) -> Option<Vec<Message>> {
    if entries.is_empty() {
        return None;
    }

    Some(
        entries
            .into_iter()
            .filter_map(HistoryEntry::into_message)
            .collect(),
    )
}

// ===== LLM WIRE MODELS =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// User turn carrying an image (data url or http url) followed by text
    pub fn user_with_image(image_url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url.into() },
                },
                ContentPart::Text { text: text.into() },
            ]),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageUrl { .. } => None,
            }),
        }
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<HistoryEntry>,
}

/// Streaming body; a missing message streams the input prompt instead.
#[derive(Debug, Default, Deserialize)]
pub struct StreamChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MultimodalJsonRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<HistoryEntry>,
    /// Base64 payload, optionally as a `data:image/...;base64,` url
    #[serde(default)]
    pub image_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextToImageRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub n: Option<u8>,
    #[serde(default)]
    pub size: Option<String>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: ConversationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<Message>,
    pub conversation_id: ConversationId,
}

#[derive(Debug, Serialize)]
pub struct TextToImageResponse {
    pub image_urls: Vec<String>,
    pub conversation_id: ConversationId,
}

// ===== STREAM EVENT MODELS =====

#[derive(Debug, Serialize, Deserialize)]
pub struct StreamCompletion {
    pub message: String,
    pub conversation_id: ConversationId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StreamError {
    pub error: String,
}
