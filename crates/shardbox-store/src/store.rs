//! Encrypt and decrypt pipelines
//!
//! Encrypt: chunk the input, seal each chunk under a fresh data key, wrap
//! the data key under the master key, erasure-code the sealed blob into
//! N+M shard files, then sign and persist the manifest.
//!
//! Decrypt is the dual: verify the manifest signature first, then per
//! chunk read/reconstruct shards, unwrap the data key and open the blob.
//! No plaintext is emitted past a failed authentication.
//!
//! Both pipelines stream one chunk at a time; memory stays bounded by the
//! maximum chunk size regardless of input size. A failed encrypt leaves
//! the partially-written manifest directory in place for the caller to
//! garbage-collect.

use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tracing::{debug, info};

use shardbox_chunks::Chunker;
use shardbox_core::{EncryptionOptions, ShardboxError, ShardboxResult};
use shardbox_crypto::{
    aead, derive_master_key, generate_data_key, random_salt, unwrap_data_key, wrap_data_key,
    CryptoError, KdfParams, MasterKey, SALT_SIZE,
};
use shardbox_erasure::{ErasureCoder, ErasureError};

use crate::manifest::Manifest;
use crate::names;

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// Stateless handle on a storage root. All state lives on disk under
/// `<storage_dir>/<manifest_id>/`; distinct manifest ids may be processed
/// in parallel by the caller.
pub struct ShardStore {
    storage_dir: PathBuf,
}

impl ShardStore {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn manifest_dir(&self, manifest_id: &str) -> PathBuf {
        self.storage_dir.join(manifest_id)
    }

    fn manifest_path(&self, manifest_id: &str) -> PathBuf {
        self.manifest_dir(manifest_id).join(names::MANIFEST_FILE)
    }

    /// Encrypt `local_path` into a new manifest directory and return its id.
    pub fn encrypt_file(
        &self,
        local_path: &Path,
        opts: &EncryptionOptions,
    ) -> ShardboxResult<String> {
        opts.validate()?;

        let orig_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ShardboxError::InvalidOptions(format!(
                    "input path {} has no file name",
                    local_path.display()
                ))
            })?;

        let manifest_id = names::new_manifest_id()?;
        let outdir = self.manifest_dir(&manifest_id);
        fs::create_dir_all(&outdir)?;
        set_mode(&outdir, DIR_MODE)?;

        let salt = random_salt().map_err(crypto_fatal)?;
        let kdf_params = KdfParams {
            time: opts.argon2_time,
            memory_kb: opts.argon2_memory_kb,
            threads: opts.argon2_threads,
        };
        // Scoped to this call; the locked buffer is wiped on every exit path.
        let master = derive_master_key(&opts.passphrase, &salt, &kdf_params).map_err(crypto_fatal)?;

        let input = File::open(local_path)?;
        let mut chunker = Chunker::new(BufReader::new(input), opts.chunk_size_kb);

        let mut chunk_bases = Vec::new();
        let mut shard_suffixes = Vec::new();
        let mut encrypted_chunk_sizes = Vec::new();
        let mut encrypted_data_keys = Vec::new();

        while let Some(chunk) = chunker.next_chunk()? {
            let data_key = generate_data_key().map_err(crypto_fatal)?;
            let blob = aead::seal(&chunk.data, data_key.as_bytes()).map_err(crypto_fatal)?;
            let wrapped = wrap_data_key(&master, &data_key).map_err(crypto_fatal)?;
            // Single use done: sealed its chunk and been wrapped.
            drop(data_key);

            let coder =
                ErasureCoder::new(opts.data_shards, opts.parity_shards).map_err(erasure_fatal)?;
            let mut shards = coder.split(&blob).map_err(erasure_fatal)?;
            coder.encode(&mut shards).map_err(erasure_fatal)?;

            let base = names::chunk_base(chunk.index);
            let mut suffixes = Vec::with_capacity(shards.len());
            for (slot, shard) in shards.iter().enumerate() {
                let suffix = names::shard_suffix(slot);
                let path = outdir.join(format!("{base}{suffix}"));
                fs::write(&path, shard)?;
                set_mode(&path, FILE_MODE)?;
                suffixes.push(suffix);
            }

            debug!(
                chunk = chunk.index,
                plaintext_bytes = chunk.data.len(),
                shards = shards.len(),
                "chunk sealed and sharded"
            );

            encrypted_data_keys.push(wrapped);
            encrypted_chunk_sizes.push(blob.len() as u64);
            chunk_bases.push(base);
            shard_suffixes.push(suffixes);
        }

        let encrypted_orig_filename =
            aead::seal(orig_name.as_bytes(), master.as_bytes()).map_err(crypto_fatal)?;

        let chunks = chunk_bases.len();
        let mut manifest = Manifest {
            salt: salt.to_vec(),
            argon2_time: opts.argon2_time,
            argon2_memory_kb: opts.argon2_memory_kb,
            argon2_threads: opts.argon2_threads,
            data_shards: opts.data_shards,
            parity_shards: opts.parity_shards,
            chunk_bases,
            shard_suffixes,
            encrypted_chunk_sizes,
            encrypted_data_keys,
            encrypted_orig_filename,
            signature: None,
        };
        manifest.sign(master.as_bytes())?;

        let manifest_path = self.manifest_path(&manifest_id);
        fs::write(&manifest_path, manifest.to_pretty_bytes()?)?;
        set_mode(&manifest_path, FILE_MODE)?;

        info!(
            manifest_id = %manifest_id,
            chunks,
            shards = opts.data_shards + opts.parity_shards,
            "file encrypted"
        );
        Ok(manifest_id)
    }

    /// Decrypt the file behind `manifest_id`.
    ///
    /// If `output_path` is empty or an existing directory, the decrypted
    /// original filename is joined to it; otherwise it is used verbatim.
    pub fn decrypt_file(
        &self,
        manifest_id: &str,
        output_path: &Path,
        passphrase: &SecretString,
    ) -> ShardboxResult<()> {
        names::validate_manifest_id(manifest_id)?;

        let dir = self.manifest_dir(manifest_id);
        let manifest = Manifest::load(&self.manifest_path(manifest_id))?;
        manifest.validate()?;

        let salt: [u8; SALT_SIZE] = manifest
            .salt
            .as_slice()
            .try_into()
            .map_err(|_| ShardboxError::Manifest("salt length".into()))?;
        let kdf_params = KdfParams {
            time: manifest.argon2_time,
            memory_kb: manifest.argon2_memory_kb,
            threads: manifest.argon2_threads,
        };
        let master = derive_master_key(passphrase, &salt, &kdf_params).map_err(crypto_fatal)?;

        // Nothing is decrypted before the manifest authenticates. A failure
        // here may be tampering or a wrong passphrase; the two cases are
        // indistinguishable.
        manifest.verify_signature(master.as_bytes())?;

        let orig_name = open_filename(&manifest, &master)?;
        let final_path = resolve_output_path(output_path, &orig_name);
        if let Some(parent) = final_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut output = File::create(&final_path)?;

        let coder = ErasureCoder::new(manifest.data_shards, manifest.parity_shards)
            .map_err(erasure_fatal)?;

        for (i, base) in manifest.chunk_bases.iter().enumerate() {
            let mut shards: Vec<Option<Vec<u8>>> = Vec::with_capacity(coder.total_shards());
            let mut present = 0usize;
            for suffix in &manifest.shard_suffixes[i] {
                let shard_path = dir.join(format!("{base}{suffix}"));
                match fs::read(&shard_path) {
                    Ok(bytes) => {
                        present += 1;
                        shards.push(Some(bytes));
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => shards.push(None),
                    Err(e) => return Err(e.into()),
                }
            }

            if present < coder.data_shards() {
                return Err(ShardboxError::InsufficientShards {
                    chunk: i,
                    have: present,
                    need: coder.data_shards(),
                });
            }

            if !coder.verify(&shards) {
                debug!(chunk = i, present, "shards inconsistent, reconstructing");
                coder.reconstruct(&mut shards).map_err(|e| match e {
                    ErasureError::TooFewShards { have, need } => {
                        ShardboxError::InsufficientShards { chunk: i, have, need }
                    }
                    _ => ShardboxError::ReconstructFailed { chunk: i },
                })?;
            }

            let blob = coder
                .join(&shards, manifest.encrypted_chunk_sizes[i] as usize)
                .map_err(|_| ShardboxError::ReconstructFailed { chunk: i })?;

            let data_key = unwrap_data_key(&master, &manifest.encrypted_data_keys[i])
                .map_err(|_| ShardboxError::ChunkAuthFailed { chunk: i })?;
            let plaintext = aead::open(&blob, data_key.as_bytes())
                .map_err(|_| ShardboxError::ChunkAuthFailed { chunk: i })?;
            drop(data_key);

            output.write_all(&plaintext)?;
            debug!(chunk = i, bytes = plaintext.len(), "chunk decrypted");
        }

        output.flush()?;
        info!(
            manifest_id = %manifest_id,
            chunks = manifest.chunk_bases.len(),
            shards = manifest.data_shards + manifest.parity_shards,
            output = %final_path.display(),
            "file decrypted"
        );
        Ok(())
    }
}

fn open_filename(manifest: &Manifest, master: &MasterKey) -> ShardboxResult<String> {
    let name_bytes = aead::open(&manifest.encrypted_orig_filename, master.as_bytes())
        .map_err(|_| ShardboxError::DecryptionFailed)?;
    String::from_utf8(name_bytes).map_err(|_| ShardboxError::DecryptionFailed)
}

fn resolve_output_path(output_path: &Path, orig_name: &str) -> PathBuf {
    if output_path.as_os_str().is_empty() || output_path.is_dir() {
        output_path.join(orig_name)
    } else {
        output_path.to_path_buf()
    }
}

/// Primitive-layer failures on the forward path are either missing OS
/// entropy or out-of-range KDF parameters; anything else is a programming
/// error surfaced verbatim.
fn crypto_fatal(e: CryptoError) -> ShardboxError {
    match e {
        CryptoError::Entropy(msg) => ShardboxError::Entropy(msg),
        CryptoError::Kdf(msg) => ShardboxError::InvalidOptions(msg),
        other => ShardboxError::Crypto(other.to_string()),
    }
}

/// Split/encode preconditions are enforced by option validation, so a
/// failure here is a programming error.
fn erasure_fatal(e: ErasureError) -> ShardboxError {
    ShardboxError::Erasure(e.to_string())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_resolution() {
        let dir = tempfile::TempDir::new().unwrap();

        // Empty path: bare original name.
        assert_eq!(
            resolve_output_path(Path::new(""), "photo.jpg"),
            PathBuf::from("photo.jpg")
        );
        // Existing directory: join.
        assert_eq!(
            resolve_output_path(dir.path(), "photo.jpg"),
            dir.path().join("photo.jpg")
        );
        // Anything else: verbatim.
        let explicit = dir.path().join("renamed.jpg");
        assert_eq!(resolve_output_path(&explicit, "photo.jpg"), explicit);
    }
}
