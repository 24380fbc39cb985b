//! WeCom Callback Cryptography
//!
//! Envelope protocol used by WeCom (Enterprise WeChat) application callbacks.
//!
//! - **Signature**: SHA-1 over the lexicographically sorted
//!   `(token, timestamp, nonce, payload)` tuple
//! - **Envelope**: AES-256-CBC over a length-prefixed frame that carries the
//!   receiver id (the corporate id) after the message

pub mod callback;
pub mod envelope;
pub mod error;
pub mod signature;

pub use callback::CallbackCrypto;
pub use envelope::{EncodingKey, Envelope};
pub use error::{CryptoError, Result};
pub use signature::{sign, verify};
