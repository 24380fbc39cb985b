//! Server Configuration
//!
//! Loads configuration from environment variables.

use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default processing notice sent before the bot answer is ready.
pub const DEFAULT_PENDING_NOTICE: &str = "您的消息正在处理中，请耐心等待约1分钟...";

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3001")
    pub bind_address: String,

    /// Callback verification token configured in the WeCom console
    pub wecom_token: String,

    /// 43-character `EncodingAESKey` configured in the WeCom console
    pub wecom_encoding_aes_key: String,

    /// Corporate id, also the receiver id inside callback frames
    pub wecom_corp_id: String,

    /// Application secret used to obtain access tokens
    pub wecom_corp_secret: String,

    /// WeCom API base URL (default: `https://qyapi.weixin.qq.com`)
    pub wecom_api_base: String,

    /// Access tokens are refreshed this many seconds before expiry (default: 300)
    pub token_refresh_margin_secs: i64,

    /// Coze personal access token
    pub coze_token: String,

    /// Coze bot id
    pub coze_bot_id: String,

    /// Coze API base URL (default: `https://api.coze.cn`)
    pub coze_api_base: String,

    /// Maximum chat status polls before giving up (default: 30)
    pub poll_max_attempts: u32,

    /// Delay between chat status polls in milliseconds (default: 5000)
    pub poll_interval_ms: u64,

    /// Byte budget per outbound segment, excluding the `[i/n]` marker (default: 2000)
    pub segment_max_bytes: usize,

    /// Pause between consecutive segments in milliseconds (default: 100)
    pub segment_send_delay_ms: u64,

    /// Timeout for outbound HTTP calls in seconds (default: 30)
    pub http_timeout_secs: u64,

    /// Text message sent while the bot is working (empty disables it)
    pub pending_notice: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3001".into()),
            wecom_token: env::var("WECHAT_TOKEN").context("WECHAT_TOKEN must be set")?,
            wecom_encoding_aes_key: env::var("WECHAT_ENCODING_AES_KEY")
                .context("WECHAT_ENCODING_AES_KEY must be set")?,
            wecom_corp_id: env::var("WECHAT_CORP_ID").context("WECHAT_CORP_ID must be set")?,
            wecom_corp_secret: env::var("WECHAT_CORP_SECRET")
                .context("WECHAT_CORP_SECRET must be set")?,
            wecom_api_base: env::var("WECOM_API_BASE")
                .unwrap_or_else(|_| "https://qyapi.weixin.qq.com".into()),
            token_refresh_margin_secs: env::var("TOKEN_REFRESH_MARGIN_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300), // 5 min
            coze_token: env::var("COZE_TOKEN").context("COZE_TOKEN must be set")?,
            coze_bot_id: env::var("COZE_BOT_ID").context("COZE_BOT_ID must be set")?,
            coze_api_base: env::var("COZE_API_BASE")
                .unwrap_or_else(|_| "https://api.coze.cn".into()),
            poll_max_attempts: env::var("POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(30),
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            segment_max_bytes: env::var("SEGMENT_MAX_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(2000),
            segment_send_delay_ms: env::var("SEGMENT_SEND_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            pending_notice: env::var("PENDING_NOTICE")
                .unwrap_or_else(|_| DEFAULT_PENDING_NOTICE.into()),
        })
    }

    /// Delay between chat status polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Pause between consecutive segments.
    #[must_use]
    pub const fn segment_send_delay(&self) -> Duration {
        Duration::from_millis(self.segment_send_delay_ms)
    }

    /// Timeout for outbound HTTP calls.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Create a default configuration for testing.
    ///
    /// Uses the sample token, key and corp id from the WeCom callback
    /// documentation; API bases point at an unroutable local port until a
    /// test overrides them with a mock server URL.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:3001".into(),
            wecom_token: "QDG6eK".into(),
            wecom_encoding_aes_key: "jWmYm7qr5nMoAUwZRjGtBxmz3KA1tkAj3ykkR6q2B2C".into(),
            wecom_corp_id: "wx5823bf96d3bd56c7".into(),
            wecom_corp_secret: "test-corp-secret".into(),
            wecom_api_base: "http://127.0.0.1:9".into(),
            token_refresh_margin_secs: 300,
            coze_token: "test-coze-token".into(),
            coze_bot_id: "test-bot".into(),
            coze_api_base: "http://127.0.0.1:9".into(),
            poll_max_attempts: 5,
            poll_interval_ms: 1,
            segment_max_bytes: 2000,
            segment_send_delay_ms: 0,
            http_timeout_secs: 5,
            pending_notice: DEFAULT_PENDING_NOTICE.into(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("wecom_token", &"[REDACTED]")
            .field("wecom_encoding_aes_key", &"[REDACTED]")
            .field("wecom_corp_id", &self.wecom_corp_id)
            .field("wecom_corp_secret", &"[REDACTED]")
            .field("wecom_api_base", &self.wecom_api_base)
            .field("token_refresh_margin_secs", &self.token_refresh_margin_secs)
            .field("coze_token", &"[REDACTED]")
            .field("coze_bot_id", &self.coze_bot_id)
            .field("coze_api_base", &self.coze_api_base)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("segment_max_bytes", &self.segment_max_bytes)
            .field("segment_send_delay_ms", &self.segment_send_delay_ms)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish_non_exhaustive()
    }
}
