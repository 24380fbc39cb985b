//! Callback Handlers
//!
//! `GET /wechat/coze` answers the URL-verification handshake.
//! `POST /wechat/coze` acknowledges an encrypted message and hands it to the
//! relay pipeline.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use wecom_crypto::Envelope;

use super::error::CallbackError;
use super::xml;
use crate::api::AppState;

/// Plaintext of the acknowledgement returned for every accepted message.
pub const ACK_PLAINTEXT: &str = "success";

/// Query string of the URL-verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub msg_signature: String,
    pub timestamp: String,
    pub nonce: String,
    pub echostr: String,
}

/// Query string of a message callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub msg_signature: String,
    pub timestamp: String,
    pub nonce: String,
}

/// GET /wechat/coze
#[instrument(skip(state, query), fields(timestamp = %query.timestamp))]
pub async fn verify_url(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, CallbackError> {
    // Form decoding turns an unescaped '+' of the base64 challenge into a space.
    let echostr = query.echostr.replace(' ', "+");
    let plaintext = state.crypto.verify_url(
        &query.msg_signature,
        &query.timestamp,
        &query.nonce,
        &echostr,
    )?;

    info!("URL verification succeeded");
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        plaintext,
    ))
}

/// POST /wechat/coze
#[instrument(skip(state, query, body), fields(timestamp = %query.timestamp))]
pub async fn receive_message(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    body: String,
) -> Result<impl IntoResponse, CallbackError> {
    let outer = xml::parse_callback_body(&body)?;
    let envelope = Envelope {
        ciphertext: outer.encrypt,
        signature: query.msg_signature,
        timestamp: query.timestamp,
        nonce: query.nonce,
    };

    let plaintext = state.crypto.open(&envelope)?;
    let message = xml::parse_message(&plaintext)?;
    info!(
        from_user = %message.from_user_name,
        msg_type = %message.msg_type,
        msg_id = message.msg_id.as_deref().unwrap_or_default(),
        "Callback message accepted"
    );

    let ack = state
        .crypto
        .seal(ACK_PLAINTEXT, &envelope.timestamp, &envelope.nonce);
    let reply = xml::render_reply(&ack);
    debug!(bytes = reply.len(), "Acknowledgement sealed");

    state.relay.spawn(message);

    Ok(([(header::CONTENT_TYPE, "application/xml")], reply))
}
