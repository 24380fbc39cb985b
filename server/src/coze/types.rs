//! Coze v3 Chat API Types

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Response envelope shared by all Coze endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Lifecycle state of an asynchronous chat.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ChatStatus {
    Created,
    InProgress,
    Completed,
    Failed,
    RequiresAction,
    Canceled,
    /// A status this relay does not know about.
    Unknown(String),
}

impl ChatStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RequiresAction => "requires_action",
            Self::Canceled => "canceled",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for ChatStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "created" => Self::Created,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "requires_action" => Self::RequiresAction,
            "canceled" => Self::Canceled,
            _ => Self::Unknown(raw),
        }
    }
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details attached to a failed chat.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LastError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

/// Token usage reported for a completed chat.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub token_count: i64,
    #[serde(default)]
    pub output_count: i64,
    #[serde(default)]
    pub input_count: i64,
}

/// Chat object returned by create and retrieve.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatObject {
    pub id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub bot_id: Option<String>,
    pub status: ChatStatus,
    #[serde(default)]
    pub last_error: Option<LastError>,
    #[serde(default)]
    pub required_action: Option<serde_json::Value>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Message attached to a chat request.
#[derive(Debug, Serialize)]
pub struct AdditionalMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
    pub content_type: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl<'a> AdditionalMessage<'a> {
    /// A plain-text user question.
    pub const fn question(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
            content_type: "text",
            kind: "question",
        }
    }
}

/// Body of `POST /v3/chat`.
#[derive(Debug, Serialize)]
pub struct CreateChatRequest<'a> {
    pub bot_id: &'a str,
    pub user_id: &'a str,
    /// WeCom cannot consume streamed replies.
    pub stream: bool,
    /// Required for the message list endpoint to return the answer.
    pub auto_save_history: bool,
    pub additional_messages: Vec<AdditionalMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<&'a HashMap<String, String>>,
}

/// Message returned by `GET /v3/chat/message/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub role: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl ChatMessage {
    pub fn is_assistant_answer(&self) -> bool {
        self.role == "assistant" && self.kind == "answer"
    }
}

/// Result of a completed chat round trip.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub chat: ChatObject,
    pub messages: Vec<ChatMessage>,
}

impl ChatReply {
    /// The last assistant answer, if any.
    pub fn answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_assistant_answer())
            .map(|m| m.content.as_str())
    }
}
