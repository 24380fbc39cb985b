//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use wecom_crypto::CallbackCrypto;

use crate::{callback, config::Config, relay::Relay};

/// Callback bodies are small XML envelopes.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Callback signature and envelope codec
    pub crypto: Arc<CallbackCrypto>,
    /// Bot relay run after each accepted message
    pub relay: Arc<Relay>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(crypto: CallbackCrypto, relay: Relay) -> Self {
        Self {
            crypto: Arc::new(crypto),
            relay: Arc::new(relay),
        }
    }

    /// Build the codec and the upstream clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let crypto = CallbackCrypto::new(
            &config.wecom_token,
            &config.wecom_encoding_aes_key,
            &config.wecom_corp_id,
        )
        .context("Invalid WeCom callback credentials")?;

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        let relay = Relay::from_config(config, &http);
        Ok(Self::new(crypto, relay))
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/wechat/coze",
            get(callback::handlers::verify_url).post(callback::handlers::receive_message),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Crate version
    version: &'static str,
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
