//! Per-file manifest: the signed record binding salt, KDF parameters,
//! wrapped data keys and shard layout
//!
//! Two encodings of the same struct:
//! - the **canonical form**: compact JSON with `signature` absent, the
//!   exact bytes the HMAC covers;
//! - the **persisted form**: pretty-printed JSON including `signature`.
//!
//! Both use the struct's declaration order for keys, so parsing the
//! persisted form, detaching the signature and re-encoding compact
//! reproduces the signed bytes exactly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use shardbox_core::{ShardboxError, ShardboxResult};
use shardbox_crypto::{mac, SALT_SIZE};

/// Everything needed to reconstruct and decrypt one file, except the
/// passphrase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Argon2id salt, 16 bytes.
    #[serde(with = "b64")]
    pub salt: Vec<u8>,
    pub argon2_time: u32,
    pub argon2_memory_kb: u32,
    pub argon2_threads: u8,
    pub data_shards: usize,
    pub parity_shards: usize,
    /// One base name per chunk, index-aligned (`chunk_<i>`).
    pub chunk_bases: Vec<String>,
    /// Per chunk, the N+M shard file suffixes in shard order.
    pub shard_suffixes: Vec<Vec<String>>,
    /// Per chunk, the encrypted blob length before erasure padding.
    pub encrypted_chunk_sizes: Vec<u64>,
    /// Per chunk, the data key wrapped under the master key.
    #[serde(with = "b64_list")]
    pub encrypted_data_keys: Vec<Vec<u8>>,
    #[serde(with = "b64")]
    pub encrypted_orig_filename: Vec<u8>,
    /// HMAC-SHA256 over the canonical form. Absent while signing.
    #[serde(default, with = "b64_opt", skip_serializing_if = "Option::is_none")]
    pub signature: Option<Vec<u8>>,
}

impl Manifest {
    /// The byte-deterministic encoding the signature covers: compact JSON
    /// with `signature` omitted.
    pub fn canonical_bytes(&self) -> ShardboxResult<Vec<u8>> {
        let mut unsigned = self.clone();
        unsigned.signature = None;
        serde_json::to_vec(&unsigned)
            .map_err(|e| ShardboxError::Manifest(format!("canonical encoding: {e}")))
    }

    /// Compute and attach the HMAC under the raw master key bytes.
    pub fn sign(&mut self, master_key: &[u8]) -> ShardboxResult<()> {
        let canonical = self.canonical_bytes()?;
        self.signature = Some(mac::sign(&canonical, master_key));
        Ok(())
    }

    /// Constant-time signature check. A missing signature fails like a
    /// wrong one; both are indistinguishable from a wrong passphrase.
    pub fn verify_signature(&self, master_key: &[u8]) -> ShardboxResult<()> {
        let Some(signature) = &self.signature else {
            return Err(ShardboxError::ManifestAuthFailed);
        };
        let canonical = self.canonical_bytes()?;
        if !mac::verify(&canonical, signature, master_key) {
            return Err(ShardboxError::ManifestAuthFailed);
        }
        Ok(())
    }

    /// Structural invariants: salt length, positive parameters, and all
    /// parallel arrays aligned on the chunk count.
    pub fn validate(&self) -> ShardboxResult<()> {
        if self.salt.len() != SALT_SIZE {
            return Err(ShardboxError::Manifest(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                self.salt.len()
            )));
        }
        if self.argon2_time == 0 || self.argon2_memory_kb == 0 || self.argon2_threads == 0 {
            return Err(ShardboxError::Manifest(
                "argon2 parameters must be positive".into(),
            ));
        }
        if self.data_shards == 0 {
            return Err(ShardboxError::Manifest("data_shards must be positive".into()));
        }

        let chunks = self.chunk_bases.len();
        if self.shard_suffixes.len() != chunks
            || self.encrypted_chunk_sizes.len() != chunks
            || self.encrypted_data_keys.len() != chunks
        {
            return Err(ShardboxError::Manifest(
                "parallel chunk arrays have mismatched lengths".into(),
            ));
        }

        let total = self.data_shards + self.parity_shards;
        for (i, row) in self.shard_suffixes.iter().enumerate() {
            if row.len() != total {
                return Err(ShardboxError::Manifest(format!(
                    "chunk {i}: expected {total} shard suffixes, got {}",
                    row.len()
                )));
            }
        }
        Ok(())
    }

    /// Pretty-printed persisted form.
    pub fn to_pretty_bytes(&self) -> ShardboxResult<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| ShardboxError::Manifest(format!("encoding: {e}")))
    }

    pub fn from_slice(data: &[u8]) -> ShardboxResult<Self> {
        serde_json::from_slice(data).map_err(|e| ShardboxError::Manifest(format!("parsing: {e}")))
    }

    pub fn load(path: &Path) -> ShardboxResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_slice(&data)
    }
}

mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod b64_list {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(list: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = list.iter().map(|bytes| STANDARD.encode(bytes)).collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .into_iter()
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .collect()
    }
}

mod b64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        opt: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match opt {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}
