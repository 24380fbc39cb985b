//! AES-256-CBC Envelope Codec
//!
//! Plaintext frame layout (before padding):
//!
//! ```text
//! random(16) || msg_len(4, big-endian) || msg(msg_len) || receiver_id
//! ```
//!
//! The frame is padded with PKCS#7 to a multiple of 32 bytes, encrypted with
//! AES-256-CBC and base64 encoded. The IV is the first 16 bytes of the key,
//! which the platform mandates for wire compatibility.

use std::fmt;

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};
use crate::signature;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Length of the configured base64 key (without its implicit `=`).
pub const ENCODED_KEY_LEN: usize = 43;

/// Raw AES-256 key length.
pub const KEY_LEN: usize = 32;

/// AES block size; decoded ciphertext must be a multiple of it.
pub const BLOCK_SIZE: usize = 16;

/// PKCS#7 padding block used by the platform.
pub const PAD_BLOCK: usize = 32;

/// Random bytes prepended to every frame.
pub const RANDOM_PREFIX_LEN: usize = 16;

const LENGTH_FIELD_LEN: usize = 4;

/// Platform keys are random 43-character strings, so the unused low bits of
/// the final character are not guaranteed to be zero.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Symmetric key decoded from the configured `EncodingAESKey`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncodingKey {
    bytes: [u8; KEY_LEN],
}

impl EncodingKey {
    /// Decode a 43-character base64 key (an `=` is appended before decoding).
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        if encoded.len() != ENCODED_KEY_LEN {
            return Err(CryptoError::InvalidKey("expected 43 base64 characters"));
        }

        let mut decoded = KEY_ENGINE
            .decode(format!("{encoded}="))
            .map_err(|_| CryptoError::InvalidKey("not valid base64"))?;

        if decoded.len() != KEY_LEN {
            decoded.zeroize();
            return Err(CryptoError::InvalidKey("expected 32 decoded bytes"));
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { bytes })
    }

    /// Build a key from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    fn iv(&self) -> [u8; BLOCK_SIZE] {
        let mut iv = [0u8; BLOCK_SIZE];
        iv.copy_from_slice(&self.bytes[..BLOCK_SIZE]);
        iv
    }
}

impl fmt::Debug for EncodingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncodingKey([REDACTED])")
    }
}

/// A signed, encrypted payload as exchanged over the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Base64 AES-256-CBC ciphertext.
    pub ciphertext: String,
    /// Lowercase hex SHA-1 signature.
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
}

impl Envelope {
    /// Check the envelope signature against the shared token.
    pub fn verify(&self, token: &str) -> bool {
        signature::verify(
            &self.signature,
            token,
            &self.timestamp,
            &self.nonce,
            &self.ciphertext,
        )
    }
}

/// Encrypt `message` into a base64 ciphertext with a fresh random prefix.
pub fn encrypt(message: &str, key: &EncodingKey, receiver_id: &str) -> String {
    let mut random = [0u8; RANDOM_PREFIX_LEN];
    rand::thread_rng().fill_bytes(&mut random);
    encrypt_with_prefix(message, key, receiver_id, random)
}

fn encrypt_with_prefix(
    message: &str,
    key: &EncodingKey,
    receiver_id: &str,
    random: [u8; RANDOM_PREFIX_LEN],
) -> String {
    let unpadded_len = RANDOM_PREFIX_LEN + LENGTH_FIELD_LEN + message.len() + receiver_id.len();
    let pad = PAD_BLOCK - unpadded_len % PAD_BLOCK;

    let mut frame = Vec::with_capacity(unpadded_len + pad);
    frame.extend_from_slice(&random);
    frame.extend_from_slice(&(message.len() as u32).to_be_bytes());
    frame.extend_from_slice(message.as_bytes());
    frame.extend_from_slice(receiver_id.as_bytes());
    frame.resize(unpadded_len + pad, pad as u8);

    let ciphertext = Aes256CbcEnc::new(&key.bytes.into(), &key.iv().into())
        .encrypt_padded_vec_mut::<NoPadding>(&frame);
    frame.zeroize();

    STANDARD.encode(ciphertext)
}

/// Decrypt a base64 ciphertext and return the framed message.
///
/// The frame is checked strictly in wire order: random prefix, length field,
/// message, then receiver id.
pub fn decrypt(ciphertext: &str, key: &EncodingKey, receiver_id: &str) -> Result<String> {
    let raw = STANDARD
        .decode(ciphertext.trim())
        .map_err(|_| CryptoError::Framing("ciphertext is not valid base64"))?;

    if raw.is_empty() || raw.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::Framing("ciphertext is not block aligned"));
    }

    let mut frame = Aes256CbcDec::new(&key.bytes.into(), &key.iv().into())
        .decrypt_padded_vec_mut::<NoPadding>(&raw)
        .map_err(|_| CryptoError::Padding)?;

    let result = unpadded_len(&frame).and_then(|len| read_frame(&frame[..len], receiver_id));
    frame.zeroize();
    result
}

/// Length of `frame` without its PKCS#7 padding (pad values 1..=32 accepted).
fn unpadded_len(frame: &[u8]) -> Result<usize> {
    let pad = usize::from(*frame.last().ok_or(CryptoError::Padding)?);
    if pad == 0 || pad > PAD_BLOCK || pad > frame.len() {
        return Err(CryptoError::Padding);
    }
    if frame[frame.len() - pad..].iter().any(|&b| usize::from(b) != pad) {
        return Err(CryptoError::Padding);
    }
    Ok(frame.len() - pad)
}

fn read_frame(frame: &[u8], receiver_id: &str) -> Result<String> {
    let body = frame
        .get(RANDOM_PREFIX_LEN..)
        .filter(|body| body.len() >= LENGTH_FIELD_LEN)
        .ok_or(CryptoError::Framing("frame too short"))?;

    let (len_field, rest) = body.split_at(LENGTH_FIELD_LEN);
    let mut len_bytes = [0u8; LENGTH_FIELD_LEN];
    len_bytes.copy_from_slice(len_field);
    let msg_len = u32::from_be_bytes(len_bytes) as usize;

    if msg_len > rest.len() {
        return Err(CryptoError::Framing("length field exceeds frame"));
    }

    let (message, trailing_id) = rest.split_at(msg_len);
    if trailing_id != receiver_id.as_bytes() {
        return Err(CryptoError::IdentityMismatch);
    }

    String::from_utf8(message.to_vec()).map_err(|_| CryptoError::InvalidUtf8)
}
