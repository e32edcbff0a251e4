//! In-memory store
//!
//! Backs tests and acts as the reference implementation of the atomicity
//! contract: one mutex serializes every access, so the per-file counter
//! increment and compare-and-delete are atomic with respect to each other.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{FileRecord, MetadataStore, ObjectStore, StorageError, TileRecord};
use crate::audit::AuditEntry;

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, Vec<u8>>,
    files: BTreeMap<String, FileRecord>,
    tiles: BTreeMap<String, TileRecord>,
    audit: Vec<AuditEntry>,
}

/// Mutex-guarded in-memory object + metadata store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panicking test; propagate the panic.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of stored objects, for assertions.
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }
}

impl ObjectStore for MemoryStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.lock().objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.lock()
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.lock().objects.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }
}

impl MetadataStore for MemoryStore {
    fn insert_file(&self, record: FileRecord) -> Result<(), StorageError> {
        self.lock().files.insert(record.id.clone(), record);
        Ok(())
    }

    fn file(&self, id: &str) -> Result<FileRecord, StorageError> {
        self.lock()
            .files
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn files(&self) -> Result<Vec<FileRecord>, StorageError> {
        Ok(self.lock().files.values().cloned().collect())
    }

    fn record_access(&self, id: &str, now: DateTime<Utc>) -> Result<FileRecord, StorageError> {
        let mut inner = self.lock();
        let record = inner
            .files
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        record.access_count += 1;
        record.last_accessed_at = Some(now);
        Ok(record.clone())
    }

    fn remove_file(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.lock().files.remove(id).is_some())
    }

    fn insert_tile(&self, record: TileRecord) -> Result<(), StorageError> {
        self.lock().tiles.insert(record.id.clone(), record);
        Ok(())
    }

    fn tiles(&self) -> Result<Vec<TileRecord>, StorageError> {
        Ok(self.lock().tiles.values().cloned().collect())
    }

    fn set_tags(&self, tile_id: &str, tags: Vec<String>) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let tile = inner
            .tiles
            .get_mut(tile_id)
            .ok_or_else(|| StorageError::NotFound(tile_id.to_string()))?;
        tile.tags = tags;
        Ok(())
    }

    fn remove_tile(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.lock().tiles.remove(id).is_some())
    }

    fn append_audit(&self, entry: AuditEntry) -> Result<(), StorageError> {
        self.lock().audit.push(entry);
        Ok(())
    }

    fn audit_for(&self, file_id: &str) -> Result<Vec<AuditEntry>, StorageError> {
        Ok(self
            .lock()
            .audit
            .iter()
            .filter(|e| e.file_id == file_id)
            .cloned()
            .collect())
    }
}
