use thiserror::Error;

pub type ShardboxResult<T> = Result<T, ShardboxError>;

/// Everything the pipelines can surface to a caller.
///
/// Authentication failures are deliberately coarse: `ManifestAuthFailed`
/// does not distinguish a tampered manifest from a wrong passphrase, because
/// the HMAC key is derived from the passphrase and the two cases are
/// cryptographically indistinguishable.
#[derive(Debug, Error)]
pub enum ShardboxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("entropy unavailable: {0}")]
    Entropy(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("chunking failed: {0}")]
    Chunking(String),

    #[error("erasure coding failed: {0}")]
    Erasure(String),

    #[error("chunk {chunk}: {have} of {need} required shards present")]
    InsufficientShards {
        chunk: usize,
        have: usize,
        need: usize,
    },

    #[error("chunk {chunk}: shard reconstruction failed")]
    ReconstructFailed { chunk: usize },

    #[error("manifest signature verification failed")]
    ManifestAuthFailed,

    #[error("chunk {chunk}: authentication failed")]
    ChunkAuthFailed { chunk: usize },

    #[error("filename decryption failed")]
    DecryptionFailed,

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("config error: {0}")]
    Config(String),
}
