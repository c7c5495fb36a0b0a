use thiserror::Error;

use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// Failures at the primitive layer. The pipelines map these into the
/// caller-facing taxonomy (wrong-key vs corruption vs entropy).
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("entropy unavailable: {0}")]
    Entropy(String),

    #[error("invalid key length: {0} bytes (expected {KEY_SIZE})")]
    InvalidKeyLength(usize),

    #[error("ciphertext too short: {len} bytes (minimum {})", NONCE_SIZE + TAG_SIZE)]
    MalformedCiphertext { len: usize },

    #[error("AEAD authentication failed")]
    AuthFailed,

    #[error("AEAD seal failed")]
    SealFailed,

    #[error("key derivation failed: {0}")]
    Kdf(String),
}
