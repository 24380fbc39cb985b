//! Coze Error Types

use thiserror::Error;

/// Errors from the Coze chat API.
#[derive(Debug, Error)]
pub enum CozeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Coze API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Coze API error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("Coze API response has no data")]
    MissingData,

    #[error("No assistant answer in chat {chat_id}")]
    NoAnswer { chat_id: String },

    #[error(transparent)]
    Poll(#[from] PollError),
}

/// Terminal outcomes of the completion poller other than success.
#[derive(Debug, Error)]
pub enum PollError {
    /// The status query itself failed; not retried.
    #[error("Chat status query failed: {0}")]
    Query(Box<CozeError>),

    #[error("Chat failed: {0}")]
    Failed(String),

    #[error("Chat requires action: {0}")]
    RequiresAction(String),

    #[error("Chat was canceled")]
    Canceled,

    #[error("Unknown chat status: {0}")]
    UnknownStatus(String),

    #[error("Chat still running after {attempts} polls")]
    Timeout { attempts: u32 },
}
