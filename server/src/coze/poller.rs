//! Completion Poller
//!
//! Coze chats run asynchronously and offer no push notification, so the
//! relay polls the chat status at a fixed interval under a bounded attempt
//! budget.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::error::{CozeError, PollError};
use super::types::{ChatObject, ChatStatus};

/// Anything that can report the current state of a chat.
pub trait ChatStatusSource {
    fn chat_status(
        &self,
        chat_id: &str,
        conversation_id: &str,
    ) -> impl Future<Output = Result<ChatObject, CozeError>> + Send;
}

/// Attempt budget and fixed delay between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(5),
        }
    }
}

/// Poll until the chat reaches a terminal status.
///
/// Polls once per attempt and sleeps `interval` between attempts (not after
/// the last one). A failing status query ends polling immediately.
pub async fn await_completion<S>(
    source: &S,
    chat_id: &str,
    conversation_id: &str,
    policy: PollPolicy,
) -> Result<ChatObject, PollError>
where
    S: ChatStatusSource + Sync,
{
    for attempt in 1..=policy.max_attempts {
        let chat = source
            .chat_status(chat_id, conversation_id)
            .await
            .map_err(|e| PollError::Query(Box::new(e)))?;

        debug!(chat_id, attempt, status = %chat.status, "Polled chat status");

        match chat.status {
            ChatStatus::Completed => return Ok(chat),
            ChatStatus::Failed => {
                let reason = chat
                    .last_error
                    .map(|e| e.msg)
                    .filter(|msg| !msg.is_empty())
                    .unwrap_or_else(|| "unknown error".to_string());
                return Err(PollError::Failed(reason));
            }
            ChatStatus::RequiresAction => {
                let action = chat
                    .required_action
                    .map_or_else(|| "null".to_string(), |v| v.to_string());
                return Err(PollError::RequiresAction(action));
            }
            ChatStatus::Canceled => return Err(PollError::Canceled),
            ChatStatus::Unknown(status) => return Err(PollError::UnknownStatus(status)),
            ChatStatus::Created | ChatStatus::InProgress => {
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }

    Err(PollError::Timeout {
        attempts: policy.max_attempts,
    })
}
