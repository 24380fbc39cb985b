//! WeCom Error Types

use thiserror::Error;

/// Errors from the WeCom server API.
#[derive(Debug, Error)]
pub enum WecomError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WeCom API returned HTTP {0}")]
    Status(u16),

    #[error("Failed to obtain access token ({errcode}): {errmsg}")]
    Token { errcode: i64, errmsg: String },

    #[error("Failed to send message ({errcode}): {errmsg}")]
    Send { errcode: i64, errmsg: String },
}

impl WecomError {
    /// Whether the error means the cached access token is no longer accepted.
    pub const fn is_token_rejected(&self) -> bool {
        // 40014: invalid access_token, 42001: access_token expired
        matches!(
            self,
            Self::Send {
                errcode: 40014 | 42001,
                ..
            }
        )
    }
}
