//! Tamper and wrong-passphrase scenarios
//!
//! Manifest integrity is bound to the passphrase-derived key; shard
//! integrity is bound per chunk by AEAD. These tests pin down which error
//! kind each class of damage produces.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tempfile::TempDir;

use shardbox_store::{EncryptionOptions, Manifest, ShardStore, ShardboxError};

fn test_options(data_shards: usize, parity_shards: usize) -> EncryptionOptions {
    EncryptionOptions {
        passphrase: SecretString::from("correct"),
        data_shards,
        parity_shards,
        chunk_size_kb: 64,
        argon2_time: 1,
        argon2_memory_kb: 1024,
        argon2_threads: 1,
    }
}

fn write_input(dir: &Path, content: &[u8]) -> PathBuf {
    let path = dir.join("input.bin");
    std::fs::write(&path, content).expect("write input file");
    path
}

fn manifest_path(store: &ShardStore, manifest_id: &str) -> PathBuf {
    store.storage_dir().join(manifest_id).join("manifest.json")
}

fn rewrite_manifest(store: &ShardStore, manifest_id: &str, manifest: &Manifest) {
    std::fs::write(
        manifest_path(store, manifest_id),
        manifest.to_pretty_bytes().unwrap(),
    )
    .unwrap();
}

#[test]
fn tampered_manifest_field_fails_auth() {
    let tmp = TempDir::new().unwrap();
    let store = ShardStore::new(tmp.path().join("storage"));
    let input = write_input(tmp.path(), &vec![0x11u8; 200 * 1024]);

    let opts = test_options(4, 2);
    let manifest_id = store.encrypt_file(&input, &opts).unwrap();

    let mut manifest = Manifest::load(&manifest_path(&store, &manifest_id)).unwrap();
    manifest.encrypted_data_keys[0][5] ^= 0x01;
    rewrite_manifest(&store, &manifest_id, &manifest);

    let result = store.decrypt_file(&manifest_id, tmp.path(), &opts.passphrase);
    assert!(matches!(result, Err(ShardboxError::ManifestAuthFailed)));
}

#[test]
fn stripped_signature_fails_auth() {
    let tmp = TempDir::new().unwrap();
    let store = ShardStore::new(tmp.path().join("storage"));
    let input = write_input(tmp.path(), b"some bytes");

    let opts = test_options(2, 1);
    let manifest_id = store.encrypt_file(&input, &opts).unwrap();

    let mut manifest = Manifest::load(&manifest_path(&store, &manifest_id)).unwrap();
    manifest.signature = None;
    rewrite_manifest(&store, &manifest_id, &manifest);

    let result = store.decrypt_file(&manifest_id, tmp.path(), &opts.passphrase);
    assert!(matches!(result, Err(ShardboxError::ManifestAuthFailed)));
}

#[test]
fn wrong_passphrase_fails_at_the_manifest() {
    let tmp = TempDir::new().unwrap();
    let store = ShardStore::new(tmp.path().join("storage"));
    let input = write_input(tmp.path(), &vec![0x22u8; 100 * 1024]);

    let opts = test_options(3, 1);
    let manifest_id = store.encrypt_file(&input, &opts).unwrap();

    // Signature verification precedes every shard read, so a wrong
    // passphrase can never surface as a chunk-level failure.
    let result = store.decrypt_file(&manifest_id, tmp.path(), &SecretString::from("wrong"));
    assert!(matches!(result, Err(ShardboxError::ManifestAuthFailed)));
}

#[test]
fn corrupted_parity_shards_within_tolerance_still_decrypt() {
    let tmp = TempDir::new().unwrap();
    let store = ShardStore::new(tmp.path().join("storage"));
    let original = vec![0x33u8; 300 * 1024];
    let input = write_input(tmp.path(), &original);

    let opts = test_options(4, 2);
    let manifest_id = store.encrypt_file(&input, &opts).unwrap();

    // Damage both parity shards of chunk 0. The data shards still join to
    // the original blob, so decryption succeeds.
    let dir = store.storage_dir().join(&manifest_id);
    for slot in [4, 5] {
        let path = dir.join(format!("chunk_0_shard_{slot}.dat"));
        let mut shard = std::fs::read(&path).unwrap();
        shard[10] ^= 0xFF;
        std::fs::write(&path, shard).unwrap();
    }

    let outdir = tmp.path().join("out");
    std::fs::create_dir_all(&outdir).unwrap();
    store
        .decrypt_file(&manifest_id, &outdir, &opts.passphrase)
        .unwrap();

    assert_eq!(std::fs::read(outdir.join("input.bin")).unwrap(), original);
}

#[test]
fn corrupted_data_shard_without_parity_fails_chunk_auth() {
    let tmp = TempDir::new().unwrap();
    let store = ShardStore::new(tmp.path().join("storage"));
    let input = write_input(tmp.path(), &vec![0x44u8; 100 * 1024]);

    let opts = test_options(3, 0);
    let manifest_id = store.encrypt_file(&input, &opts).unwrap();

    let path = store
        .storage_dir()
        .join(&manifest_id)
        .join("chunk_0_shard_1.dat");
    let mut shard = std::fs::read(&path).unwrap();
    shard[0] ^= 0x80;
    std::fs::write(&path, shard).unwrap();

    // No parity means nothing to reconstruct from; the AEAD tag is the
    // only line of defense and it holds.
    let outdir = tmp.path().join("out");
    std::fs::create_dir_all(&outdir).unwrap();
    let result = store.decrypt_file(&manifest_id, &outdir, &opts.passphrase);
    assert!(matches!(
        result,
        Err(ShardboxError::ChunkAuthFailed { chunk: 0 })
    ));
}

#[test]
fn truncated_shard_is_contained_to_its_chunk_error() {
    let tmp = TempDir::new().unwrap();
    let store = ShardStore::new(tmp.path().join("storage"));
    let input = write_input(tmp.path(), &vec![0x55u8; 200 * 1024]);

    let opts = test_options(4, 2);
    let manifest_id = store.encrypt_file(&input, &opts).unwrap();

    // A wrong-length shard can neither verify nor reconstruct.
    let path = store
        .storage_dir()
        .join(&manifest_id)
        .join("chunk_0_shard_2.dat");
    let shard = std::fs::read(&path).unwrap();
    std::fs::write(&path, &shard[..shard.len() / 2]).unwrap();

    let outdir = tmp.path().join("out");
    std::fs::create_dir_all(&outdir).unwrap();
    let result = store.decrypt_file(&manifest_id, &outdir, &opts.passphrase);
    assert!(matches!(
        result,
        Err(ShardboxError::ReconstructFailed { chunk: 0 })
    ));
}

#[test]
fn malformed_manifest_id_is_rejected_before_io() {
    let tmp = TempDir::new().unwrap();
    let store = ShardStore::new(tmp.path().join("storage"));

    let result = store.decrypt_file(
        "../escape",
        tmp.path(),
        &SecretString::from("irrelevant"),
    );
    assert!(matches!(result, Err(ShardboxError::InvalidOptions(_))));
}
