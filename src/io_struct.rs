use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chronologically ordered turns of one conversation.
pub type ConversationHistory = Vec<ChatMessage>;

/// Body of `POST <backend>/api/chat`.
#[derive(Debug, Serialize)]
pub struct BackendChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawChunkMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChunk {
    #[serde(default)]
    message: Option<RawChunkMessage>,
    #[serde(default)]
    done: bool,
}

/// One decoded record of the backend's line-delimited chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceChunk {
    pub message_delta: Option<String>,
    pub is_final: bool,
}

impl InferenceChunk {
    /// Decodes one complete line, e.g. `{"message":{"content":"Hel"},"done":false}`.
    pub fn from_line(line: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawChunk = serde_json::from_slice(line)?;
        Ok(Self {
            message_delta: raw.message.and_then(|m| m.content),
            is_final: raw.done,
        })
    }

    /// The delta worth forwarding, if any. Empty strings carry nothing.
    pub fn content(&self) -> Option<&str> {
        self.message_delta.as_deref().filter(|c| !c.is_empty())
    }
}

/// A unit written to the browser on the streaming channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Content(String),
    Done,
    Error(String),
}

impl OutboundEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OutboundEvent::Content(_))
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatReqInput {
    pub messages: ConversationHistory,
}

#[derive(Debug, Deserialize)]
pub struct SetModelInput {
    /// Kept loose so a non-string value gets the same 400 as a missing one.
    #[serde(default)]
    pub model: Option<serde_json::Value>,
}

fn default_language() -> String {
    "javascript".to_string()
}

#[derive(Debug, Deserialize)]
pub struct GenerateCodeInput {
    pub prompt: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewCodeInput {
    pub code: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveCodeInput {
    pub code: String,
    pub filename: String,
    pub language: String,
}
