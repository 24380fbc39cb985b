//! Coze Chat Backend
//!
//! Client for the Coze v3 chat API and the completion poller that waits for
//! asynchronous chats to finish.

pub mod client;
pub mod error;
pub mod poller;
pub mod types;

pub use client::CozeClient;
pub use error::{CozeError, PollError};
pub use poller::{await_completion, ChatStatusSource, PollPolicy};
pub use types::{ChatMessage, ChatObject, ChatReply, ChatStatus};
