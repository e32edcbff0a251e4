//! Vault end-to-end scenarios
//!
//! Upload with and without encryption, digest verification under mutation,
//! and wrong-password behavior, driven through the real pipeline against
//! in-memory and filesystem stores.

use chrono::{DateTime, Utc};

use tile_forge::pipeline::{PipelineError, UploadPipeline, UploadRequest};
use tile_forge::retention::RetentionClass;
use tile_forge::store::{FsObjectStore, JsonMetadataStore, MemoryStore, MetadataStore, ObjectStore};
use tile_forge::vault;

fn now() -> DateTime<Utc> {
    "2026-03-01T00:00:00Z".parse().unwrap()
}

fn request(name: &str, bytes: &[u8], password: Option<&str>) -> UploadRequest {
    UploadRequest {
        file_name: name.to_string(),
        mime_type: "application/octet-stream".to_string(),
        bytes: bytes.to_vec(),
        retention: RetentionClass::SevenDays,
        password: password.map(|p| p.to_string()),
    }
}

#[test]
fn test_unencrypted_ten_byte_upload() {
    let store = MemoryStore::new();
    let pipeline = UploadPipeline::new(&store, &store);

    let bytes = b"ten bytes!";
    assert_eq!(bytes.len(), 10);
    let record = pipeline.upload(request("small.bin", bytes, None), now()).unwrap();

    assert_eq!(record.security.digest, vault::digest(bytes));
    assert!(!record.security.encrypted);
    assert!(record.security.envelope.is_none());

    // The persisted metadata JSON carries no salt or nonce at all
    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains("salt"));
    assert!(!json.contains("nonce"));
}

#[test]
fn test_encrypted_upload_with_password_secret() {
    let store = MemoryStore::new();
    let pipeline = UploadPipeline::new(&store, &store);

    let bytes = b"the quick brown fox";
    let record = pipeline
        .upload(request("secret.bin", bytes, Some("secret")), now())
        .unwrap();

    let envelope = record.security.envelope.as_ref().unwrap();
    assert_eq!(envelope.salt.len(), 32, "16-byte salt, hex-encoded");
    assert_eq!(envelope.nonce.len(), 24, "12-byte nonce, hex-encoded");

    // Right password recovers the original bytes
    let opened = pipeline.open(&record.id, Some("secret"), now()).unwrap();
    assert_eq!(opened.bytes, bytes);

    // Wrong password is a decryption error, never wrong plaintext
    let err = pipeline.open(&record.id, Some("wrong"), now()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Vault(vault::VaultError::Decryption)
    ));
}

#[test]
fn test_digest_verify_and_mutation() {
    let bytes = b"integrity matters".to_vec();
    let expected = vault::digest(&bytes);

    assert!(vault::verify(&bytes, &expected));

    for i in 0..bytes.len() {
        let mut mutated = bytes.clone();
        mutated[i] ^= 0x80;
        assert!(!vault::verify(&mutated, &expected), "byte {i}");
    }
}

#[test]
fn test_key_derivation_round_trip_property() {
    for payload in [&b""[..], b"x", b"a longer plaintext payload with spaces"] {
        let derived = vault::derive("pass-phrase", None);
        let (ciphertext, nonce) = vault::encrypt(payload, derived.key()).unwrap();

        let rederived = vault::derive("pass-phrase", Some(derived.salt()));
        let recovered = vault::decrypt(&ciphertext, rederived.key(), &nonce).unwrap();
        assert_eq!(recovered, payload);
    }
}

#[test]
fn test_cross_password_decryption_always_fails() {
    let derived = vault::derive("p1", None);
    let (ciphertext, nonce) = vault::encrypt(b"confidential", derived.key()).unwrap();

    for wrong in ["p2", "P1", "p1 ", ""] {
        let other = vault::derive(wrong, Some(derived.salt()));
        assert!(
            vault::decrypt(&ciphertext, other.key(), &nonce).is_err(),
            "password {wrong:?} should not decrypt"
        );
    }
}

#[test]
fn test_access_counter_increments_per_open() {
    let store = MemoryStore::new();
    let pipeline = UploadPipeline::new(&store, &store);

    let record = pipeline
        .upload(request("counted.bin", b"count me", None), now())
        .unwrap();

    for expected in 1..=3u64 {
        let opened = pipeline.open(&record.id, None, now()).unwrap();
        assert_eq!(opened.record.access_count, expected);
    }
}

#[test]
fn test_filesystem_stores_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let objects = FsObjectStore::new(dir.path().join("objects")).unwrap();
    let metadata = JsonMetadataStore::new(dir.path().join("records.json")).unwrap();

    let record = UploadPipeline::new(&objects, &metadata)
        .upload(request("durable.bin", b"persisted", Some("secret")), now())
        .unwrap();

    // Fresh handles over the same directory see the same state
    let objects = FsObjectStore::new(dir.path().join("objects")).unwrap();
    let metadata = JsonMetadataStore::new(dir.path().join("records.json")).unwrap();
    assert_eq!(metadata.files().unwrap().len(), 1);
    assert!(objects.get(&record.object_key).is_ok());

    let opened = UploadPipeline::new(&objects, &metadata)
        .open(&record.id, Some("secret"), now())
        .unwrap();
    assert_eq!(opened.bytes, b"persisted");
}
