//! Relay Pipeline
//!
//! Turns a decrypted callback message into a bot answer delivered back to
//! the sender: markdown normalization, segmentation, and ordered delivery.

pub mod format;
pub mod pipeline;
pub mod segment;

pub use pipeline::{deliver_reply, MessageSink, Relay, RelayError, RelaySettings};
