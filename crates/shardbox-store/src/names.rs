//! Manifest identifiers and shard file naming

use shardbox_core::{ShardboxError, ShardboxResult};
use shardbox_crypto::{random_bytes, CryptoError};

/// Length of a manifest id: 16 random bytes as lowercase hex.
pub const MANIFEST_ID_LEN: usize = 32;

/// File name of the manifest inside its directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Generate a fresh manifest id.
pub fn new_manifest_id() -> ShardboxResult<String> {
    let bytes = random_bytes(MANIFEST_ID_LEN / 2).map_err(|e| match e {
        CryptoError::Entropy(msg) => ShardboxError::Entropy(msg),
        other => ShardboxError::Crypto(other.to_string()),
    })?;
    Ok(hex_encode(&bytes))
}

/// Reject anything that is not 32 lowercase hex chars before it can touch
/// the filesystem (the id names a directory under the storage root).
pub fn validate_manifest_id(id: &str) -> ShardboxResult<()> {
    let well_formed = id.len() == MANIFEST_ID_LEN
        && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !well_formed {
        return Err(ShardboxError::InvalidOptions(format!(
            "malformed manifest id: {id:?}"
        )));
    }
    Ok(())
}

pub fn chunk_base(index: usize) -> String {
    format!("chunk_{index}")
}

pub fn shard_suffix(slot: usize) -> String {
    format!("_shard_{slot}.dat")
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
