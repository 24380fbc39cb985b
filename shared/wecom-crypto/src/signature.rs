//! SHA-1 Callback Signing
//!
//! Signs and verifies the `(token, timestamp, nonce, payload)` tuple. The same
//! function covers inbound verification and outbound reply signing.

use sha1::{Digest, Sha1};

/// Sign the tuple and return the lowercase hex SHA-1 digest.
///
/// The four strings are sorted by byte order and concatenated without a
/// separator, so argument order does not affect the result.
pub fn sign(token: &str, timestamp: &str, nonce: &str, payload: &str) -> String {
    let mut parts = [token, timestamp, nonce, payload];
    parts.sort_unstable();

    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Verify a received signature against the tuple.
pub fn verify(signature: &str, token: &str, timestamp: &str, nonce: &str, payload: &str) -> bool {
    let expected = sign(token, timestamp, nonce, payload);
    // Constant-time comparison
    expected.len() == signature.len()
        && expected
            .as_bytes()
            .iter()
            .zip(signature.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
