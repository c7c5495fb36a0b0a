//! Key derivation: Argon2id passphrase → master key

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};

use crate::error::CryptoError;
use crate::keys::MasterKey;
use crate::locked::LockedBuffer;
use crate::{KEY_SIZE, SALT_SIZE};

/// Argon2id cost parameters. Recorded in the manifest so decryption can
/// re-derive the same key.
#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    /// Iteration count (> 0).
    pub time: u32,
    /// Memory cost in KiB (> 0).
    pub memory_kb: u32,
    /// Lane count (> 0).
    pub threads: u8,
}

/// Derive the 256-bit master key from a passphrase and salt.
///
/// The salt is 16 random bytes generated per manifest; it is stored in the
/// manifest and does not need to be secret. Parameter failures only occur
/// when values are outside the library's range and are fatal.
pub fn derive_master_key(
    passphrase: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> Result<MasterKey, CryptoError> {
    let argon2_params = Params::new(
        params.memory_kb,
        params.time,
        u32::from(params.threads),
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::Kdf(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::Kdf(format!("Argon2id failed: {e}")))?;

    Ok(MasterKey::from_locked(LockedBuffer::from_bytes(&mut key)))
}
