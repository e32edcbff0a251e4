//! External collaborator interfaces
//!
//! The core hands bytes to an object store and records to a metadata
//! store; both are external services reached through these traits. The
//! metadata store owns the only genuinely shared mutable state in the
//! system, the per-file access counter and deletion flag, and must apply
//! them atomically per file identifier. The core implements no locking of
//! its own.

mod fs;
mod memory;

pub use fs::{FsObjectStore, JsonMetadataStore};
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::AuditEntry;
use crate::vault::FileSecurityMetadata;
use forge_schema::ClarityTile;

/// External store failures, surfaced distinctly from validation failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Byte storage for uploaded objects (an object-storage service in
/// production, a directory or an in-memory map here).
pub trait ObjectStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Persisted file row: identity plus security metadata plus the
/// store-owned access accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub file_name: String,
    pub size: u64,
    pub mime_type: String,

    /// Key of the stored object (ciphertext when encrypted)
    pub object_key: String,

    pub security: FileSecurityMetadata,

    /// Incremented atomically on each authorized access
    pub access_count: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Persisted tile row. Immutable after creation except for tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileRecord {
    pub id: String,

    /// Generation mode label
    pub mode: String,

    /// The prompt material as submitted
    pub raw_input: serde_json::Value,

    /// The normalized record
    pub tile: ClarityTile,

    /// Caller-supplied labels, managed by the store
    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
}

/// Record persistence with per-file atomicity.
///
/// Implementations must serialize concurrent accesses to one file id:
/// `record_access` is an atomic read-modify-write and `remove_file` is a
/// compare-and-delete that reports whether the record was still present.
pub trait MetadataStore {
    fn insert_file(&self, record: FileRecord) -> Result<(), StorageError>;

    fn file(&self, id: &str) -> Result<FileRecord, StorageError>;

    fn files(&self) -> Result<Vec<FileRecord>, StorageError>;

    /// Atomically increment the access counter and stamp the access time,
    /// returning the updated record.
    fn record_access(&self, id: &str, now: DateTime<Utc>) -> Result<FileRecord, StorageError>;

    /// Delete the record if it is still present. Returns `false` when a
    /// concurrent consumer already removed it.
    fn remove_file(&self, id: &str) -> Result<bool, StorageError>;

    fn insert_tile(&self, record: TileRecord) -> Result<(), StorageError>;

    fn tiles(&self) -> Result<Vec<TileRecord>, StorageError>;

    /// Replace the tag list of a tile.
    fn set_tags(&self, tile_id: &str, tags: Vec<String>) -> Result<(), StorageError>;

    fn remove_tile(&self, id: &str) -> Result<bool, StorageError>;

    fn append_audit(&self, entry: AuditEntry) -> Result<(), StorageError>;

    fn audit_for(&self, file_id: &str) -> Result<Vec<AuditEntry>, StorageError>;
}
