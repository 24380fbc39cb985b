//! WeCom Server API Client
//!
//! Obtains application access tokens and sends application messages.

use chrono::{TimeDelta, Utc};
use tracing::{info, instrument, warn};

use super::error::WecomError;
use super::token::{AccessTokenCache, CachedToken};
use super::types::{OutboundMessage, SendResponse, TokenResponse};
use crate::config::Config;

/// Client for one WeCom application.
pub struct WecomClient {
    http: reqwest::Client,
    base_url: String,
    corp_id: String,
    corp_secret: String,
    tokens: AccessTokenCache,
}

impl WecomClient {
    /// Create a client against `base_url` (e.g. `https://qyapi.weixin.qq.com`).
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        corp_id: &str,
        corp_secret: &str,
        refresh_margin: TimeDelta,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            corp_id: corp_id.to_string(),
            corp_secret: corp_secret.to_string(),
            tokens: AccessTokenCache::new(refresh_margin),
        }
    }

    /// Create a client from server configuration.
    pub fn from_config(config: &Config, http: reqwest::Client) -> Self {
        Self::new(
            http,
            &config.wecom_api_base,
            &config.wecom_corp_id,
            &config.wecom_corp_secret,
            TimeDelta::seconds(config.token_refresh_margin_secs),
        )
    }

    /// `GET /cgi-bin/gettoken`: request a new access token.
    pub async fn fetch_token(&self) -> Result<CachedToken, WecomError> {
        let now = Utc::now();
        let response = self
            .http
            .get(format!("{}/cgi-bin/gettoken", self.base_url))
            .query(&[
                ("corpid", self.corp_id.as_str()),
                ("corpsecret", self.corp_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WecomError::Status(response.status().as_u16()));
        }

        let body: TokenResponse = response.json().await?;
        match (body.errcode, body.access_token) {
            (0, Some(token)) => {
                let expires_in = body.expires_in.unwrap_or(7200);
                info!(expires_in, "Access token obtained");
                Ok(CachedToken::issued_at(token, now, expires_in))
            }
            (errcode, _) => Err(WecomError::Token {
                errcode,
                errmsg: body.errmsg,
            }),
        }
    }

    /// A valid access token, from cache when possible.
    pub async fn access_token(&self) -> Result<String, WecomError> {
        self.tokens.get_or_refresh(|| self.fetch_token()).await
    }

    /// `POST /cgi-bin/message/send`: deliver one application message.
    #[instrument(skip(self, message), fields(touser = %message.touser, agentid = message.agentid))]
    pub async fn send(&self, message: &OutboundMessage) -> Result<(), WecomError> {
        let access_token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}/cgi-bin/message/send", self.base_url))
            .query(&[("access_token", access_token.as_str())])
            .json(message)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WecomError::Status(response.status().as_u16()));
        }

        let body: SendResponse = response.json().await?;
        if body.errcode != 0 {
            let err = WecomError::Send {
                errcode: body.errcode,
                errmsg: body.errmsg,
            };
            if err.is_token_rejected() {
                warn!("Access token rejected, dropping cached token");
                self.tokens.invalidate().await;
            }
            return Err(err);
        }

        if let Some(invalid) = body.invaliduser.filter(|u| !u.is_empty()) {
            warn!(invaliduser = %invalid, "Message not delivered to some users");
        }
        Ok(())
    }
}
