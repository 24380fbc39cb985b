//! WeCom API Types

use serde::{Deserialize, Serialize};

/// Response of `GET /cgi-bin/gettoken`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    pub access_token: Option<String>,
    /// Lifetime in seconds (7200 for application tokens).
    pub expires_in: Option<i64>,
}

/// Response of `POST /cgi-bin/message/send`.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(default)]
    pub invaliduser: Option<String>,
}

/// Text payload shared by `text` and `markdown` messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub content: String,
}

/// Message body, tagged by `msgtype`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum MessageBody {
    Text { text: Content },
    Markdown { markdown: Content },
}

/// Application message sent to a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub touser: String,
    pub agentid: i64,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl OutboundMessage {
    pub fn text(touser: &str, agentid: i64, content: impl Into<String>) -> Self {
        Self {
            touser: touser.to_string(),
            agentid,
            body: MessageBody::Text {
                text: Content {
                    content: content.into(),
                },
            },
        }
    }

    pub fn markdown(touser: &str, agentid: i64, content: impl Into<String>) -> Self {
        Self {
            touser: touser.to_string(),
            agentid,
            body: MessageBody::Markdown {
                markdown: Content {
                    content: content.into(),
                },
            },
        }
    }

    /// The message text regardless of type.
    pub fn content(&self) -> &str {
        match &self.body {
            MessageBody::Text { text } => &text.content,
            MessageBody::Markdown { markdown } => &markdown.content,
        }
    }
}
