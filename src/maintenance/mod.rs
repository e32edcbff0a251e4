//! Maintenance surface
//!
//! What an external scheduler calls: expiry statistics, the sweep that
//! deletes expired objects and records, and the whole-account bulk delete.
//! The caller presents a bearer credential checked by flat equality against
//! the configured secret; scheduling itself is external.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditAction, AuditEntry};
use crate::retention::{is_expired, is_expiring_soon};
use crate::store::{MetadataStore, ObjectStore, StorageError};

/// Flat-equality bearer check.
pub fn authorize(presented: &str, configured: &str) -> bool {
    presented == configured
}

/// Counts returned by the stats call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStats {
    /// Files whose expiry instant has passed
    pub expired: u64,
    /// Files expiring within the next 24 hours
    pub expiring_soon: u64,
    /// All files
    pub total: u64,
    /// Files with no expiry instant
    pub never_expire: u64,
}

/// Result of one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub deleted: u64,
    pub errors: u64,
}

/// Result of a whole-account bulk delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteOutcome {
    pub files_deleted: u64,
    pub tiles_deleted: u64,
    pub errors: u64,
}

/// Maintenance operations over the two stores.
pub struct Maintenance<'a, O: ObjectStore, M: MetadataStore> {
    objects: &'a O,
    metadata: &'a M,
    verbose: bool,
}

impl<'a, O: ObjectStore, M: MetadataStore> Maintenance<'a, O, M> {
    pub fn new(objects: &'a O, metadata: &'a M) -> Self {
        Self {
            objects,
            metadata,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Count files by expiry status.
    pub fn stats(&self, now: DateTime<Utc>) -> Result<MaintenanceStats, StorageError> {
        let files = self.metadata.files()?;

        let mut stats = MaintenanceStats {
            expired: 0,
            expiring_soon: 0,
            total: files.len() as u64,
            never_expire: 0,
        };
        for file in &files {
            let expires_at = file.security.expires_at;
            if is_expired(expires_at, now) {
                stats.expired += 1;
            } else if is_expiring_soon(expires_at, now) {
                stats.expiring_soon += 1;
            }
            if expires_at.is_none() {
                stats.never_expire += 1;
            }
        }
        Ok(stats)
    }

    /// Delete every expired file: object first, then record, then an audit
    /// entry. One file's failure is counted and the sweep continues.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepOutcome, StorageError> {
        let files = self.metadata.files()?;
        let mut outcome = SweepOutcome::default();

        for file in files {
            if !is_expired(file.security.expires_at, now) {
                continue;
            }

            let result = self
                .objects
                .delete(&file.object_key)
                .and_then(|()| self.metadata.remove_file(&file.id))
                .and_then(|removed| {
                    if removed {
                        self.metadata.append_audit(AuditEntry::new(
                            &file.id,
                            AuditAction::Delete,
                            "automatic_expiry",
                            now,
                        ))?;
                    }
                    Ok(())
                });

            match result {
                Ok(()) => outcome.deleted += 1,
                Err(error) => {
                    if self.verbose {
                        eprintln!("sweep: failed to delete {}: {error}", file.id);
                    }
                    outcome.errors += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// Delete every file and tile. Per-record failures are counted.
    pub fn bulk_delete(&self, now: DateTime<Utc>) -> Result<BulkDeleteOutcome, StorageError> {
        let mut outcome = BulkDeleteOutcome::default();

        for file in self.metadata.files()? {
            let result = self
                .objects
                .delete(&file.object_key)
                .and_then(|()| self.metadata.remove_file(&file.id))
                .and_then(|removed| {
                    if removed {
                        self.metadata.append_audit(AuditEntry::new(
                            &file.id,
                            AuditAction::Delete,
                            "user_request",
                            now,
                        ))?;
                    }
                    Ok(())
                });
            match result {
                Ok(()) => outcome.files_deleted += 1,
                Err(_) => outcome.errors += 1,
            }
        }

        for tile in self.metadata.tiles()? {
            match self.metadata.remove_tile(&tile.id) {
                Ok(true) => outcome.tiles_deleted += 1,
                Ok(false) => {}
                Err(_) => outcome.errors += 1,
            }
        }

        Ok(outcome)
    }
}
