//! Filesystem-backed stores
//!
//! `FsObjectStore` keeps each object as one file under a root directory.
//! `JsonMetadataStore` keeps every record in a single JSON document,
//! rewritten atomically (write-then-rename) on each mutation and guarded
//! by a mutex so the per-file atomicity contract holds within one process.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FileRecord, MetadataStore, ObjectStore, StorageError, TileRecord};
use crate::audit::AuditEntry;

/// Objects as flat files under a root directory.
#[derive(Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        // Object keys are generated internally; reject anything that could
        // escape the root.
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.starts_with('.') {
            return Err(StorageError::Backend(format!("invalid object key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let temp = path.with_extension("tmp");
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// The on-disk metadata document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    files: Vec<FileRecord>,
    #[serde(default)]
    tiles: Vec<TileRecord>,
    #[serde(default)]
    audit: Vec<AuditEntry>,
}

/// Single-file JSON metadata store.
#[derive(Debug)]
pub struct JsonMetadataStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonMetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    fn read_document(&self) -> Result<Document, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, doc: &Document) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(doc)?;
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    /// Run one guarded read-modify-write cycle against the document.
    fn update<T>(
        &self,
        apply: impl FnOnce(&mut Document) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut doc = self.read_document()?;
        let result = apply(&mut doc)?;
        self.write_document(&doc)?;
        Ok(result)
    }

    fn read<T>(
        &self,
        view: impl FnOnce(&Document) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let doc = self.read_document()?;
        view(&doc)
    }

    /// Path of the backing document, for diagnostics.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataStore for JsonMetadataStore {
    fn insert_file(&self, record: FileRecord) -> Result<(), StorageError> {
        self.update(|doc| {
            doc.files.retain(|f| f.id != record.id);
            doc.files.push(record);
            Ok(())
        })
    }

    fn file(&self, id: &str) -> Result<FileRecord, StorageError> {
        self.read(|doc| {
            doc.files
                .iter()
                .find(|f| f.id == id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.to_string()))
        })
    }

    fn files(&self) -> Result<Vec<FileRecord>, StorageError> {
        self.read(|doc| Ok(doc.files.clone()))
    }

    fn record_access(&self, id: &str, now: DateTime<Utc>) -> Result<FileRecord, StorageError> {
        self.update(|doc| {
            let record = doc
                .files
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
            record.access_count += 1;
            record.last_accessed_at = Some(now);
            Ok(record.clone())
        })
    }

    fn remove_file(&self, id: &str) -> Result<bool, StorageError> {
        self.update(|doc| {
            let before = doc.files.len();
            doc.files.retain(|f| f.id != id);
            Ok(doc.files.len() < before)
        })
    }

    fn insert_tile(&self, record: TileRecord) -> Result<(), StorageError> {
        self.update(|doc| {
            doc.tiles.retain(|t| t.id != record.id);
            doc.tiles.push(record);
            Ok(())
        })
    }

    fn tiles(&self) -> Result<Vec<TileRecord>, StorageError> {
        self.read(|doc| Ok(doc.tiles.clone()))
    }

    fn set_tags(&self, tile_id: &str, tags: Vec<String>) -> Result<(), StorageError> {
        self.update(|doc| {
            let tile = doc
                .tiles
                .iter_mut()
                .find(|t| t.id == tile_id)
                .ok_or_else(|| StorageError::NotFound(tile_id.to_string()))?;
            tile.tags = tags;
            Ok(())
        })
    }

    fn remove_tile(&self, id: &str) -> Result<bool, StorageError> {
        self.update(|doc| {
            let before = doc.tiles.len();
            doc.tiles.retain(|t| t.id != id);
            Ok(doc.tiles.len() < before)
        })
    }

    fn append_audit(&self, entry: AuditEntry) -> Result<(), StorageError> {
        self.update(|doc| {
            doc.audit.push(entry);
            Ok(())
        })
    }

    fn audit_for(&self, file_id: &str) -> Result<Vec<AuditEntry>, StorageError> {
        self.read(|doc| {
            Ok(doc
                .audit
                .iter()
                .filter(|e| e.file_id == file_id)
                .cloned()
                .collect())
        })
    }
}
