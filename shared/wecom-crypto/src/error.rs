//! Envelope Error Types

use thiserror::Error;

/// Errors raised while verifying, decrypting or encrypting callback envelopes.
///
/// Variants never carry key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The configured encoding key is not 43 base64 characters decoding to 32 bytes.
    #[error("Invalid encoding key: {0}")]
    InvalidKey(&'static str),

    /// Ciphertext or decrypted frame does not follow the wire layout.
    #[error("Malformed envelope: {0}")]
    Framing(&'static str),

    /// PKCS#7 padding could not be removed.
    #[error("Invalid padding")]
    Padding,

    /// Receiver id inside the frame differs from the configured one.
    #[error("Receiver id mismatch")]
    IdentityMismatch,

    /// The framed message is not valid UTF-8.
    #[error("Message is not valid UTF-8")]
    InvalidUtf8,

    /// Signature over the signing tuple does not match.
    #[error("Signature mismatch")]
    SignatureMismatch,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
