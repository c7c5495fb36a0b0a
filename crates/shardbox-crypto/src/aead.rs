//! AES-256-GCM seal/open
//!
//! Blob format: `[12 bytes: random nonce][N bytes: ciphertext][16 bytes: tag]`.
//! `open` never returns unauthenticated plaintext.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};

use crate::error::CryptoError;

/// AES-GCM nonce length in bytes (96-bit).
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// Encrypt `plaintext` under a 32-byte key with a fresh random nonce.
///
/// Nonce uniqueness relies on the caller's key discipline: data keys seal
/// exactly once, and the master key seals at most chunks+1 blobs per
/// manifest, well under the 96-bit random-nonce collision bound.
pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::SealFailed)?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`seal`].
///
/// Fails with `MalformedCiphertext` when the blob cannot even contain a
/// nonce and tag, and `AuthFailed` on any tag mismatch.
pub fn open(blob: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::MalformedCiphertext { len: blob.len() });
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::AuthFailed)
}
