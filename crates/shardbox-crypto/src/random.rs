//! OS-backed randomness for salts, nonces and identifiers

use rand::{rngs::OsRng, RngCore};

use crate::error::CryptoError;
use crate::SALT_SIZE;

/// Fill a fresh vector from the OS RNG. Failure means the OS RNG itself is
/// unavailable and is fatal for the caller.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, CryptoError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(bytes)
}

/// Generate a per-manifest KDF salt.
pub fn random_salt() -> Result<[u8; SALT_SIZE], CryptoError> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(salt)
}
