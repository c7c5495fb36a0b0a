//! shardbox-erasure: Reed–Solomon coding over GF(2^8)
//!
//! An encrypted chunk blob is split into N equal-length data shards
//! (zero-padded at the end) and extended with M parity shards. Any N of the
//! N+M shards recover the blob, provided the original byte length is known
//! — the joiner trims the padding, it never pads.
//!
//! M=0 degenerates to plain splitting: no parity, `verify` holds whenever
//! all data shards are present, and a single missing shard is unrecoverable.

use reed_solomon_erasure::galois_8::ReedSolomon;
use thiserror::Error;

/// GF(2^8) bound: one symbol per shard index.
pub const MAX_TOTAL_SHARDS: usize = 256;

#[derive(Debug, Error)]
pub enum ErasureError {
    #[error("invalid shard counts: {data} data + {parity} parity")]
    InvalidShardCounts { data: usize, parity: usize },

    #[error("cannot shard an empty blob")]
    EmptyInput,

    #[error("{have} of {need} required shards present")]
    TooFewShards { have: usize, need: usize },

    #[error("data shard {0} missing after reconstruction")]
    MissingDataShard(usize),

    #[error("joined shards hold {have} bytes, need {need}")]
    ShortData { have: usize, need: usize },

    #[error("reed-solomon failure: {0}")]
    Backend(String),
}

/// Coder for a fixed (N, M) geometry.
pub struct ErasureCoder {
    // None when parity_shards == 0: nothing to encode or check.
    rs: Option<ReedSolomon>,
    data_shards: usize,
    parity_shards: usize,
}

impl ErasureCoder {
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self, ErasureError> {
        if data_shards == 0 || data_shards + parity_shards > MAX_TOTAL_SHARDS {
            return Err(ErasureError::InvalidShardCounts {
                data: data_shards,
                parity: parity_shards,
            });
        }

        let rs = if parity_shards > 0 {
            Some(
                ReedSolomon::new(data_shards, parity_shards)
                    .map_err(|e| ErasureError::Backend(format!("{e:?}")))?,
            )
        } else {
            None
        };

        Ok(Self {
            rs,
            data_shards,
            parity_shards,
        })
    }

    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    pub fn parity_shards(&self) -> usize {
        self.parity_shards
    }

    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Split `blob` into N equal-length data shards, zero-padding the tail.
    /// The pad length is implicit: callers must record `blob.len()` to trim
    /// at join time.
    pub fn split(&self, blob: &[u8]) -> Result<Vec<Vec<u8>>, ErasureError> {
        if blob.is_empty() {
            return Err(ErasureError::EmptyInput);
        }

        let per_shard = blob.len().div_ceil(self.data_shards);
        let mut shards = Vec::with_capacity(self.total_shards());
        for i in 0..self.data_shards {
            let start = (i * per_shard).min(blob.len());
            let end = ((i + 1) * per_shard).min(blob.len());
            let mut shard = blob[start..end].to_vec();
            shard.resize(per_shard, 0);
            shards.push(shard);
        }
        Ok(shards)
    }

    /// Append M parity shards to the N data shards from [`split`].
    pub fn encode(&self, shards: &mut Vec<Vec<u8>>) -> Result<(), ErasureError> {
        if shards.len() != self.data_shards {
            return Err(ErasureError::InvalidShardCounts {
                data: shards.len(),
                parity: self.parity_shards,
            });
        }

        let Some(rs) = &self.rs else {
            return Ok(());
        };

        let per_shard = shards[0].len();
        for _ in 0..self.parity_shards {
            shards.push(vec![0u8; per_shard]);
        }
        rs.encode(shards)
            .map_err(|e| ErasureError::Backend(format!("{e:?}")))
    }

    /// True iff every slot is present and the parity rows are consistent.
    /// Inconsistent shard lengths also report false; the caller's next step
    /// is reconstruction either way.
    pub fn verify(&self, shards: &[Option<Vec<u8>>]) -> bool {
        if shards.len() != self.total_shards() {
            return false;
        }

        let mut refs: Vec<&[u8]> = Vec::with_capacity(shards.len());
        for shard in shards {
            match shard {
                Some(bytes) => refs.push(bytes.as_slice()),
                None => return false,
            }
        }

        match &self.rs {
            None => true,
            Some(rs) => rs.verify(&refs).unwrap_or(false),
        }
    }

    /// Rebuild every missing slot from any N present shards.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> Result<(), ErasureError> {
        let have = shards.iter().filter(|s| s.is_some()).count();
        if have < self.data_shards {
            return Err(ErasureError::TooFewShards {
                have,
                need: self.data_shards,
            });
        }

        match &self.rs {
            // Without parity, "enough shards" means "all shards".
            None => Ok(()),
            Some(rs) => rs
                .reconstruct(shards)
                .map_err(|e| ErasureError::Backend(format!("{e:?}"))),
        }
    }

    /// Concatenate the N data shards and trim to `original_size`.
    pub fn join(
        &self,
        shards: &[Option<Vec<u8>>],
        original_size: usize,
    ) -> Result<Vec<u8>, ErasureError> {
        let mut out = Vec::with_capacity(original_size);
        for (i, shard) in shards.iter().take(self.data_shards).enumerate() {
            let bytes = shard.as_ref().ok_or(ErasureError::MissingDataShard(i))?;
            out.extend_from_slice(bytes);
        }

        if out.len() < original_size {
            return Err(ErasureError::ShortData {
                have: out.len(),
                need: original_size,
            });
        }
        out.truncate(original_size);
        Ok(out)
    }
}
