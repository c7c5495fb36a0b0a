use secrecy::SecretString;

use crate::error::{ShardboxError, ShardboxResult};

/// Smallest permitted average chunk size in KiB.
pub const MIN_CHUNK_SIZE_KB: u32 = 64;
/// Largest permitted average chunk size in KiB.
pub const MAX_CHUNK_SIZE_KB: u32 = 16384;
/// GF(2^8) Reed–Solomon cannot exceed 256 total shards per codeword.
pub const MAX_TOTAL_SHARDS: usize = 256;

/// Everything an encrypt call needs beyond the input path.
///
/// The Argon2 parameters are recorded in the manifest so decryption can
/// re-derive the same master key.
#[derive(Debug)]
pub struct EncryptionOptions {
    pub passphrase: SecretString,
    pub data_shards: usize,
    pub parity_shards: usize,
    pub chunk_size_kb: u32,
    pub argon2_time: u32,
    pub argon2_memory_kb: u32,
    pub argon2_threads: u8,
}

impl EncryptionOptions {
    /// Check every parameter against its permitted range.
    ///
    /// Called on entry to the encrypt pipeline; all violations are
    /// precondition failures, never recoverable.
    pub fn validate(&self) -> ShardboxResult<()> {
        if self.data_shards == 0 {
            return Err(ShardboxError::InvalidOptions(
                "data_shards must be at least 1".into(),
            ));
        }
        if self.data_shards + self.parity_shards > MAX_TOTAL_SHARDS {
            return Err(ShardboxError::InvalidOptions(format!(
                "data_shards + parity_shards must not exceed {MAX_TOTAL_SHARDS}, got {}",
                self.data_shards + self.parity_shards
            )));
        }
        if !(MIN_CHUNK_SIZE_KB..=MAX_CHUNK_SIZE_KB).contains(&self.chunk_size_kb) {
            return Err(ShardboxError::InvalidOptions(format!(
                "chunk_size_kb must be within [{MIN_CHUNK_SIZE_KB}, {MAX_CHUNK_SIZE_KB}], got {}",
                self.chunk_size_kb
            )));
        }
        if self.argon2_time == 0 || self.argon2_memory_kb == 0 || self.argon2_threads == 0 {
            return Err(ShardboxError::InvalidOptions(
                "argon2 time, memory_kb and threads must all be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_options() -> EncryptionOptions {
        EncryptionOptions {
            passphrase: SecretString::from("correct horse battery staple"),
            data_shards: 4,
            parity_shards: 2,
            chunk_size_kb: 1024,
            argon2_time: 1,
            argon2_memory_kb: 1024,
            argon2_threads: 1,
        }
    }

    #[test]
    fn test_valid_options_pass() {
        assert!(valid_options().validate().is_ok());
    }

    #[test]
    fn test_zero_data_shards_rejected() {
        let mut opts = valid_options();
        opts.data_shards = 0;
        assert!(matches!(
            opts.validate(),
            Err(ShardboxError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_zero_parity_shards_allowed() {
        let mut opts = valid_options();
        opts.parity_shards = 0;
        assert!(opts.validate().is_ok(), "M=0 means no redundancy, not an error");
    }

    #[test]
    fn test_too_many_total_shards_rejected() {
        let mut opts = valid_options();
        opts.data_shards = 200;
        opts.parity_shards = 100;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_chunk_size_out_of_range_rejected() {
        let mut opts = valid_options();
        opts.chunk_size_kb = 32;
        assert!(opts.validate().is_err());
        opts.chunk_size_kb = 32768;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_zero_argon2_params_rejected() {
        let mut opts = valid_options();
        opts.argon2_time = 0;
        assert!(opts.validate().is_err());

        let mut opts = valid_options();
        opts.argon2_memory_kb = 0;
        assert!(opts.validate().is_err());

        let mut opts = valid_options();
        opts.argon2_threads = 0;
        assert!(opts.validate().is_err());
    }
}
