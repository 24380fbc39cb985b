//! Callback Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;
use wecom_crypto::CryptoError;

/// Errors rejecting a callback request.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("signature verification failed")]
    SignatureMismatch,

    #[error("malformed callback body: {0}")]
    MalformedXml(String),

    #[error("invalid envelope: {0}")]
    Envelope(CryptoError),
}

impl From<CryptoError> for CallbackError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::SignatureMismatch => Self::SignatureMismatch,
            other => Self::Envelope(other),
        }
    }
}

impl CallbackError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::SignatureMismatch => StatusCode::FORBIDDEN,
            Self::MalformedXml(_) | Self::Envelope(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(error = %self, status = status.as_u16(), "Callback rejected");
        let body = match self {
            Self::SignatureMismatch => "signature verification failed",
            Self::MalformedXml(_) => "malformed request body",
            Self::Envelope(_) => "invalid encrypted payload",
        };
        (status, body).into_response()
    }
}
