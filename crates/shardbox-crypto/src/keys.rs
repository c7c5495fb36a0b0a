//! Master and data key types, data-key generation and wrapping

use zeroize::Zeroize;

use crate::aead;
use crate::error::CryptoError;
use crate::locked::LockedBuffer;
use crate::KEY_SIZE;

/// The passphrase-derived key. Wraps data keys, encrypts the original
/// filename and keys the manifest HMAC. Never persisted.
pub struct MasterKey {
    buf: LockedBuffer,
}

impl MasterKey {
    pub(crate) fn from_locked(buf: LockedBuffer) -> Self {
        debug_assert_eq!(buf.len(), KEY_SIZE);
        Self { buf }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A per-chunk key: random, used for exactly one AEAD seal, then wrapped
/// under the master key and dropped.
pub struct DataKey {
    buf: LockedBuffer,
}

impl DataKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit data key in a locked buffer.
pub fn generate_data_key() -> Result<DataKey, CryptoError> {
    Ok(DataKey {
        buf: LockedBuffer::random(KEY_SIZE)?,
    })
}

/// Encrypt a data key under the master key: `nonce || ciphertext || tag`.
pub fn wrap_data_key(master: &MasterKey, key: &DataKey) -> Result<Vec<u8>, CryptoError> {
    aead::seal(key.as_bytes(), master.as_bytes())
}

/// Decrypt a wrapped data key. The plaintext copy is moved into a locked
/// buffer and the intermediate allocation is wiped.
pub fn unwrap_data_key(master: &MasterKey, wrapped: &[u8]) -> Result<DataKey, CryptoError> {
    let mut plaintext = aead::open(wrapped, master.as_bytes())?;

    if plaintext.len() != KEY_SIZE {
        plaintext.zeroize();
        return Err(CryptoError::InvalidKeyLength(wrapped.len()));
    }

    Ok(DataKey {
        buf: LockedBuffer::from_vec(plaintext),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_master_key() -> MasterKey {
        let mut bytes = [42u8; KEY_SIZE];
        MasterKey::from_locked(LockedBuffer::from_bytes(&mut bytes))
    }

    #[test]
    fn test_data_keys_are_random() {
        let k1 = generate_data_key().unwrap();
        let k2 = generate_data_key().unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let master = test_master_key();
        let key = generate_data_key().unwrap();

        let wrapped = wrap_data_key(&master, &key).unwrap();
        let unwrapped = unwrap_data_key(&master, &wrapped).unwrap();

        assert_eq!(key.as_bytes(), unwrapped.as_bytes());
    }

    #[test]
    fn test_wrapped_key_has_expected_size() {
        let master = test_master_key();
        let key = generate_data_key().unwrap();

        let wrapped = wrap_data_key(&master, &key).unwrap();
        assert_eq!(
            wrapped.len(),
            aead::NONCE_SIZE + KEY_SIZE + aead::TAG_SIZE
        );
    }

    #[test]
    fn test_unwrap_with_wrong_master_fails() {
        let mut bytes = [1u8; KEY_SIZE];
        let master1 = MasterKey::from_locked(LockedBuffer::from_bytes(&mut bytes));
        let mut bytes = [2u8; KEY_SIZE];
        let master2 = MasterKey::from_locked(LockedBuffer::from_bytes(&mut bytes));

        let key = generate_data_key().unwrap();
        let wrapped = wrap_data_key(&master1, &key).unwrap();

        assert!(matches!(
            unwrap_data_key(&master2, &wrapped),
            Err(CryptoError::AuthFailed)
        ));
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let key = generate_data_key().unwrap();
        assert!(format!("{key:?}").contains("REDACTED"));
        assert!(format!("{:?}", test_master_key()).contains("REDACTED"));
    }
}
