//! shardbox-chunks: content-defined chunking
//!
//! - `rabin`: Rabin fingerprint chunker — boundaries survive local edits,
//!   which keeps shard layouts stable and deduplication-friendly.

pub mod rabin;

pub use rabin::{Chunk, Chunker, POLYNOMIAL, WINDOW_SIZE};
