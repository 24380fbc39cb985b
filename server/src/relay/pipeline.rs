//! Relay Pipeline
//!
//! Runs after the callback has been acknowledged: asks the bot, then delivers
//! the answer back to the sender in segments. Nothing here can affect the
//! HTTP response, so every failure ends in a log line.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::format::to_wecom_markdown;
use super::segment::{segment, with_markers};
use crate::callback::{InboundMessage, MessageKind};
use crate::config::Config;
use crate::coze::{CozeClient, CozeError, PollPolicy};
use crate::wecom::{OutboundMessage, WecomClient, WecomError};

/// Reply to a `subscribe` event.
pub const SUBSCRIBE_THANKS: &str = "感谢关注!";

/// Reply to message types the bot cannot handle.
pub const UNSUPPORTED_NOTICE: &str = "暂不支持该类型消息";

/// Errors ending a relay run.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("message has no AgentID")]
    MissingAgentId,

    #[error("bot request failed: {0}")]
    Coze(#[from] CozeError),

    #[error("segment {index}/{total} not delivered: {source}")]
    Send {
        index: usize,
        total: usize,
        #[source]
        source: WecomError,
    },

    #[error("notice not delivered: {0}")]
    Notice(#[source] WecomError),
}

/// Anything that can deliver an application message.
pub trait MessageSink {
    fn deliver(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), WecomError>> + Send;
}

impl MessageSink for WecomClient {
    fn deliver(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), WecomError>> + Send {
        self.send(message)
    }
}

/// Segment `reply` and deliver each part as a markdown message.
///
/// Parts carry `[i/n]` markers when there is more than one. Delivery stops
/// at the first failure; parts already delivered stay delivered. Returns the
/// number of parts sent.
pub async fn deliver_reply<S>(
    sink: &S,
    touser: &str,
    agentid: i64,
    reply: &str,
    max_bytes: usize,
    pause: Duration,
) -> Result<usize, RelayError>
where
    S: MessageSink + Sync,
{
    let parts = with_markers(segment(reply, max_bytes));
    let total = parts.len();

    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        let message = OutboundMessage::markdown(touser, agentid, part);
        sink.deliver(&message)
            .await
            .map_err(|source| RelayError::Send {
                index: i + 1,
                total,
                source,
            })?;
        debug!(index = i + 1, total, "Segment delivered");
    }

    Ok(total)
}

/// Tunables for a relay run.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub max_bytes: usize,
    pub send_delay: Duration,
    pub poll: PollPolicy,
    pub pending_notice: String,
}

impl RelaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_bytes: config.segment_max_bytes,
            send_delay: config.segment_send_delay(),
            poll: PollPolicy {
                max_attempts: config.poll_max_attempts,
                interval: config.poll_interval(),
            },
            pending_notice: config.pending_notice.clone(),
        }
    }
}

/// Bridges decrypted callback messages to the bot and back.
pub struct Relay {
    coze: CozeClient,
    wecom: WecomClient,
    settings: RelaySettings,
}

impl Relay {
    pub const fn new(coze: CozeClient, wecom: WecomClient, settings: RelaySettings) -> Self {
        Self {
            coze,
            wecom,
            settings,
        }
    }

    pub fn from_config(config: &Config, http: &reqwest::Client) -> Self {
        Self::new(
            CozeClient::from_config(config, http.clone()),
            WecomClient::from_config(config, http.clone()),
            RelaySettings::from_config(config),
        )
    }

    /// Run [`Self::handle`] on a detached task.
    ///
    /// A panic inside the run is caught by the outer task and logged.
    pub fn spawn(self: &Arc<Self>, message: InboundMessage) {
        let relay = Arc::clone(self);
        let from_user = message.from_user_name.clone();
        tokio::spawn(async move {
            let handle = tokio::spawn(async move { relay.handle(message).await });
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(from_user = %from_user, error = %e, "Relay failed"),
                Err(e) => error!(from_user = %from_user, "Relay task panicked: {}", e),
            }
        });
    }

    /// Process one inbound message to completion.
    #[instrument(skip(self, message), fields(from_user = %message.from_user_name, msg_type = %message.msg_type))]
    pub async fn handle(&self, message: InboundMessage) -> Result<(), RelayError> {
        let agentid = message.agent_id.ok_or(RelayError::MissingAgentId)?;
        let user = message.from_user_name.as_str();

        match message.kind() {
            MessageKind::Text(content) if content.trim().is_empty() => {
                info!("Empty text message ignored");
            }
            MessageKind::Text(content) => {
                self.send_pending_notice(user, agentid).await;
                let answer = self.answer_text(&message, content).await?;
                let sent = deliver_reply(
                    &self.wecom,
                    user,
                    agentid,
                    &to_wecom_markdown(&answer),
                    self.settings.max_bytes,
                    self.settings.send_delay,
                )
                .await?;
                info!(segments = sent, "Reply delivered");
            }
            MessageKind::Event("subscribe") => {
                self.wecom
                    .deliver(&OutboundMessage::text(user, agentid, SUBSCRIBE_THANKS))
                    .await
                    .map_err(RelayError::Notice)?;
            }
            MessageKind::Event(event) => {
                info!(event, "Event ignored");
            }
            MessageKind::Other(kind) => {
                info!(kind, "Unsupported message type");
                self.wecom
                    .deliver(&OutboundMessage::text(user, agentid, UNSUPPORTED_NOTICE))
                    .await
                    .map_err(RelayError::Notice)?;
            }
        }

        Ok(())
    }

    /// Ask the bot about `content` and return its final answer.
    async fn answer_text(
        &self,
        message: &InboundMessage,
        content: &str,
    ) -> Result<String, RelayError> {
        let meta_data = HashMap::from([
            ("from_user".to_string(), message.from_user_name.clone()),
            ("to_user".to_string(), message.to_user_name.clone()),
            (
                "agent_id".to_string(),
                message.agent_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
        ]);

        let reply = self
            .coze
            .chat(
                content,
                &message.from_user_name,
                Some(&meta_data),
                self.settings.poll,
            )
            .await?;

        match reply.answer() {
            Some(answer) => Ok(answer.to_string()),
            None => Err(CozeError::NoAnswer {
                chat_id: reply.chat.id.clone(),
            }
            .into()),
        }
    }

    /// The processing notice is best-effort; the answer is still attempted.
    async fn send_pending_notice(&self, user: &str, agentid: i64) {
        if self.settings.pending_notice.is_empty() {
            return;
        }
        let notice = OutboundMessage::text(user, agentid, self.settings.pending_notice.as_str());
        if let Err(e) = self.wecom.deliver(&notice).await {
            warn!(error = %e, "Failed to send processing notice");
        }
    }
}
