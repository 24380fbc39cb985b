//! WeCom Server API
//!
//! Access-token management and application message delivery.

pub mod client;
pub mod error;
pub mod token;
pub mod types;

pub use client::WecomClient;
pub use error::WecomError;
pub use token::{AccessTokenCache, CachedToken};
pub use types::OutboundMessage;
