//! WeCom Callback Endpoint
//!
//! Handshake verification, envelope opening and the encrypted acknowledgement.

pub mod error;
pub mod handlers;
pub mod xml;

pub use error::CallbackError;
pub use xml::{InboundMessage, MessageKind};
