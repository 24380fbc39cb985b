//! Relay Server
//!
//! Receives encrypted WeCom application callbacks, acknowledges them, and
//! relays text messages to a Coze chat bot whose answers are sent back to
//! the user as application messages.

pub mod api;
pub mod callback;
pub mod config;
pub mod coze;
pub mod relay;
pub mod wecom;
