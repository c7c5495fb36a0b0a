use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{ShardboxError, ShardboxResult};
use crate::options::{EncryptionOptions, MAX_CHUNK_SIZE_KB, MIN_CHUNK_SIZE_KB, MAX_TOTAL_SHARDS};

/// Top-level configuration (loaded from a YAML file).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Average content-defined chunk size in KiB.
    pub chunk_size_kb: u32,
    /// Reed–Solomon data shard count per chunk.
    pub data_shards: usize,
    /// Reed–Solomon parity shard count per chunk (0 = no redundancy).
    pub parity_shards: usize,
    /// Argon2id key derivation parameters.
    pub argon2: Argon2Config,
    /// Root directory under which manifest directories are created.
    pub storage_path: PathBuf,
}

/// Argon2id parameters, recorded per manifest at encrypt time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Config {
    /// Iteration count.
    pub time: u32,
    /// Memory cost in KiB.
    pub memory_kb: u32,
    /// Lane / thread count.
    pub threads: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size_kb: 1024,
            data_shards: 4,
            parity_shards: 2,
            argon2: Argon2Config::default(),
            storage_path: PathBuf::from("./shardbox-data"),
        }
    }
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            time: 3,
            memory_kb: 65536,
            threads: 4,
        }
    }
}

impl Config {
    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> ShardboxResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            ShardboxError::Config(format!("reading {}: {e}", path.display()))
        })?;
        let config: Config = serde_yaml::from_str(&data)
            .map_err(|e| ShardboxError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero and out-of-range values.
    pub fn validate(&self) -> ShardboxResult<()> {
        if !(MIN_CHUNK_SIZE_KB..=MAX_CHUNK_SIZE_KB).contains(&self.chunk_size_kb) {
            return Err(ShardboxError::Config(format!(
                "chunk_size_kb must be within [{MIN_CHUNK_SIZE_KB}, {MAX_CHUNK_SIZE_KB}], got {}",
                self.chunk_size_kb
            )));
        }
        if self.data_shards == 0 {
            return Err(ShardboxError::Config("data_shards must be positive".into()));
        }
        if self.data_shards + self.parity_shards > MAX_TOTAL_SHARDS {
            return Err(ShardboxError::Config(format!(
                "data_shards + parity_shards must not exceed {MAX_TOTAL_SHARDS}"
            )));
        }
        if self.argon2.time == 0 || self.argon2.memory_kb == 0 || self.argon2.threads == 0 {
            return Err(ShardboxError::Config(
                "argon2 time, memory_kb and threads must all be positive".into(),
            ));
        }
        if self.storage_path.as_os_str().is_empty() {
            return Err(ShardboxError::Config("storage_path must not be empty".into()));
        }
        Ok(())
    }

    /// Combine the file-borne parameters with a caller-supplied passphrase.
    pub fn encryption_options(&self, passphrase: SecretString) -> EncryptionOptions {
        EncryptionOptions {
            passphrase,
            data_shards: self.data_shards,
            parity_shards: self.parity_shards,
            chunk_size_kb: self.chunk_size_kb,
            argon2_time: self.argon2.time,
            argon2_memory_kb: self.argon2.memory_kb,
            argon2_threads: self.argon2.threads,
        }
    }
}
