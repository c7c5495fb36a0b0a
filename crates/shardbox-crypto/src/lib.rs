//! shardbox-crypto: encryption primitives for the shard store
//!
//! Key hierarchy:
//! ```text
//! Master Key (256-bit, Argon2id from passphrase + per-manifest salt)
//!   ├── Data Key (per-chunk, 256-bit random, wrapped by master key)
//!   │   └── Chunk AEAD: AES-256-GCM (nonce=random_96bit, single use)
//!   ├── Filename AEAD: AES-256-GCM under the master key
//!   └── Manifest signature: HMAC-SHA256 keyed by the raw master key bytes
//! ```
//!
//! Every key lives in a [`locked::LockedBuffer`]: zeroized on drop and,
//! on unix, `mlock`ed against swap. Data keys are single-use — one AEAD
//! seal each — so random 96-bit nonces cannot collide under one key. The
//! master key performs at most chunks+1 seals per manifest; 96-bit random
//! nonces keep the collision probability negligible at that count.

pub mod aead;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod locked;
pub mod mac;
pub mod random;

pub use aead::{open, seal, NONCE_SIZE, TAG_SIZE};
pub use error::CryptoError;
pub use kdf::{derive_master_key, KdfParams};
pub use keys::{generate_data_key, unwrap_data_key, wrap_data_key, DataKey, MasterKey};
pub use locked::LockedBuffer;
pub use mac::{sign, verify, MAC_SIZE};
pub use random::{random_bytes, random_salt};

/// AES-256 / HMAC-SHA256 key length in bytes.
pub const KEY_SIZE: usize = 32;

/// Argon2id salt length in bytes.
pub const SALT_SIZE: usize = 16;
