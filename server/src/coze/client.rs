//! Coze v3 Chat Client
//!
//! Thin typed wrapper around the non-streaming chat endpoints:
//! create a chat, poll its status, then list its messages.

use std::collections::HashMap;
use std::future::Future;

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use super::error::CozeError;
use super::poller::{await_completion, ChatStatusSource, PollPolicy};
use super::types::{
    AdditionalMessage, ApiResponse, ChatMessage, ChatObject, ChatReply, CreateChatRequest,
};
use crate::config::Config;

/// Client for one Coze bot.
#[derive(Clone)]
pub struct CozeClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    bot_id: String,
}

impl CozeClient {
    /// Create a client against `base_url` (e.g. `https://api.coze.cn`).
    pub fn new(http: reqwest::Client, base_url: &str, token: &str, bot_id: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            bot_id: bot_id.to_string(),
        }
    }

    /// Create a client from server configuration.
    pub fn from_config(config: &Config, http: reqwest::Client) -> Self {
        Self::new(
            http,
            &config.coze_api_base,
            &config.coze_token,
            &config.coze_bot_id,
        )
    }

    /// `POST /v3/chat`: submit a user question and return the pending chat.
    #[instrument(skip(self, message, meta_data))]
    pub async fn create_chat(
        &self,
        message: &str,
        user_id: &str,
        conversation_id: Option<&str>,
        meta_data: Option<&HashMap<String, String>>,
    ) -> Result<ChatObject, CozeError> {
        let body = CreateChatRequest {
            bot_id: &self.bot_id,
            user_id,
            stream: false,
            auto_save_history: true,
            additional_messages: vec![AdditionalMessage::question(message)],
            conversation_id,
            meta_data,
        };

        let mut request = self
            .http
            .post(format!("{}/v3/chat", self.base_url))
            .bearer_auth(&self.token)
            .json(&body);
        if let Some(conversation_id) = conversation_id {
            request = request.query(&[("conversation_id", conversation_id)]);
        }

        let chat: ChatObject = unwrap_response(request.send().await?).await?;
        info!(chat_id = %chat.id, conversation_id = %chat.conversation_id, "Chat created");
        Ok(chat)
    }

    /// `GET /v3/chat/retrieve`: current state of a chat.
    pub async fn retrieve_chat(
        &self,
        chat_id: &str,
        conversation_id: &str,
    ) -> Result<ChatObject, CozeError> {
        let response = self
            .http
            .get(format!("{}/v3/chat/retrieve", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("chat_id", chat_id), ("conversation_id", conversation_id)])
            .send()
            .await?;
        unwrap_response(response).await
    }

    /// `GET /v3/chat/message/list`: messages produced by a chat.
    pub async fn list_messages(
        &self,
        chat_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, CozeError> {
        let response = self
            .http
            .get(format!("{}/v3/chat/message/list", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("chat_id", chat_id), ("conversation_id", conversation_id)])
            .send()
            .await?;
        unwrap_response(response).await
    }

    /// Ask the bot a question and wait for its messages.
    #[instrument(skip(self, message, meta_data))]
    pub async fn chat(
        &self,
        message: &str,
        user_id: &str,
        meta_data: Option<&HashMap<String, String>>,
        policy: PollPolicy,
    ) -> Result<ChatReply, CozeError> {
        let created = self.create_chat(message, user_id, None, meta_data).await?;
        let chat = await_completion(self, &created.id, &created.conversation_id, policy).await?;
        let messages = self.list_messages(&chat.id, &chat.conversation_id).await?;
        debug!(chat_id = %chat.id, count = messages.len(), "Fetched chat messages");
        Ok(ChatReply { chat, messages })
    }
}

impl ChatStatusSource for CozeClient {
    fn chat_status(
        &self,
        chat_id: &str,
        conversation_id: &str,
    ) -> impl Future<Output = Result<ChatObject, CozeError>> + Send {
        self.retrieve_chat(chat_id, conversation_id)
    }
}

/// Check HTTP status and the `code` field, then extract `data`.
async fn unwrap_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CozeError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(500).collect();
        return Err(CozeError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let envelope: ApiResponse<T> = response.json().await?;
    if envelope.code != 0 {
        return Err(CozeError::Api {
            code: envelope.code,
            msg: envelope.msg,
        });
    }
    envelope.data.ok_or(CozeError::MissingData)
}
