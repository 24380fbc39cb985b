//! Callback Crypto
//!
//! Bundles the shared token, encoding key and receiver id configured for one
//! WeCom application, and exposes the three operations a callback endpoint
//! needs: URL verification, opening inbound envelopes and sealing replies.

use std::fmt;

use crate::envelope::{self, EncodingKey, Envelope};
use crate::error::{CryptoError, Result};
use crate::signature;

/// Envelope crypto for a single callback endpoint.
#[derive(Clone)]
pub struct CallbackCrypto {
    token: String,
    key: EncodingKey,
    receiver_id: String,
}

impl CallbackCrypto {
    /// Build from the configured token, 43-character `EncodingAESKey` and
    /// corporate id.
    pub fn new(token: &str, encoding_aes_key: &str, receiver_id: &str) -> Result<Self> {
        Ok(Self {
            token: token.to_string(),
            key: EncodingKey::from_encoded(encoding_aes_key)?,
            receiver_id: receiver_id.to_string(),
        })
    }

    /// Verify a URL-verification handshake and return the decrypted challenge.
    ///
    /// `echostr` must already be URL-decoded.
    pub fn verify_url(
        &self,
        msg_signature: &str,
        timestamp: &str,
        nonce: &str,
        echostr: &str,
    ) -> Result<String> {
        if !signature::verify(msg_signature, &self.token, timestamp, nonce, echostr) {
            return Err(CryptoError::SignatureMismatch);
        }
        envelope::decrypt(echostr, &self.key, &self.receiver_id)
    }

    /// Verify and decrypt an inbound envelope.
    pub fn open(&self, envelope: &Envelope) -> Result<String> {
        if !envelope.verify(&self.token) {
            return Err(CryptoError::SignatureMismatch);
        }
        envelope::decrypt(&envelope.ciphertext, &self.key, &self.receiver_id)
    }

    /// Encrypt `message` and sign the fresh ciphertext with the given
    /// timestamp and nonce.
    pub fn seal(&self, message: &str, timestamp: &str, nonce: &str) -> Envelope {
        let ciphertext = envelope::encrypt(message, &self.key, &self.receiver_id);
        let signature = signature::sign(&self.token, timestamp, nonce, &ciphertext);
        Envelope {
            ciphertext,
            signature,
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
        }
    }
}

impl fmt::Debug for CallbackCrypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackCrypto")
            .field("token", &"[REDACTED]")
            .field("key", &self.key)
            .field("receiver_id", &self.receiver_id)
            .finish()
    }
}
