//! Upload and access pipeline
//!
//! Upload path: raw bytes → content digest → optional derive+encrypt →
//! object store → metadata store → audit entry. Access path: atomic access
//! accounting → fetch → optional decrypt → content verification →
//! single-use consumption.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{PipelineError, PipelineResult};
use crate::audit::{AuditAction, AuditEntry};
use crate::retention::RetentionClass;
use crate::store::{FileRecord, MetadataStore, ObjectStore};
use crate::vault::{self, FileSecurityMetadata, SecurityEnvelope};

/// One file to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub retention: RetentionClass,
    /// Encrypt the object under a key derived from this password
    pub password: Option<String>,
}

/// A per-file failure recorded while the rest of a batch continues.
#[derive(Debug)]
pub struct FileFailure {
    /// File name (uploads) or file id (accesses)
    pub file: String,
    pub error: PipelineError,
}

/// Outcome of a multi-file upload.
#[derive(Debug, Default)]
pub struct UploadBatch {
    pub uploaded: Vec<FileRecord>,
    pub failures: Vec<FileFailure>,
}

/// An opened file: the (decrypted) content plus its updated record.
#[derive(Debug)]
pub struct OpenedFile {
    pub record: FileRecord,
    pub bytes: Vec<u8>,
}

/// Upload/access orchestration over the two external stores.
pub struct UploadPipeline<'a, O: ObjectStore, M: MetadataStore> {
    objects: &'a O,
    metadata: &'a M,
    verbose: bool,
}

impl<'a, O: ObjectStore, M: MetadataStore> UploadPipeline<'a, O, M> {
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

    /// Upload one file.
    pub fn upload(&self, request: UploadRequest, now: DateTime<Utc>) -> PipelineResult<FileRecord> {
        let id = Uuid::new_v4().to_string();
        let object_key = format!("obj-{id}");
        let content_digest = vault::digest(&request.bytes);
        let size = request.bytes.len() as u64;

        let (stored_bytes, security) = match &request.password {
            Some(password) => {
                let derived = vault::derive(password, None);
                let (ciphertext, nonce) = vault::encrypt(&request.bytes, derived.key())?;
                let envelope = SecurityEnvelope::new(derived.salt(), nonce);
                let security = FileSecurityMetadata::encrypted(
                    content_digest,
                    envelope,
                    request.retention,
                    now,
                );
                (ciphertext, security)
            }
            None => {
                let security =
                    FileSecurityMetadata::plaintext(content_digest, request.retention, now);
                (request.bytes, security)
            }
        };
        security.validate()?;

        self.objects.put(&object_key, &stored_bytes)?;

        let record = FileRecord {
            id: id.clone(),
            file_name: request.file_name,
            size,
            mime_type: request.mime_type,
            object_key,
            security,
            access_count: 0,
            last_accessed_at: None,
            created_at: now,
        };
        self.metadata.insert_file(record.clone())?;
        self.metadata.append_audit(AuditEntry::new(
            &id,
            AuditAction::Upload,
            "user_upload",
            now,
        ))?;

        if self.verbose {
            eprintln!(
                "uploaded {} ({} bytes, retention {})",
                record.file_name, record.size, record.security.retention_class
            );
        }

        Ok(record)
    }

    /// Upload a batch; one file's failure never aborts the rest.
    pub fn upload_many(&self, requests: Vec<UploadRequest>, now: DateTime<Utc>) -> UploadBatch {
        let mut batch = UploadBatch::default();
        for request in requests {
            let file_name = request.file_name.clone();
            match self.upload(request, now) {
                Ok(record) => batch.uploaded.push(record),
                Err(error) => {
                    if self.verbose {
                        eprintln!("upload of {file_name} failed: {error}");
                    }
                    batch.failures.push(FileFailure {
                        file: file_name,
                        error,
                    });
                }
            }
        }
        batch
    }

    /// Open a file for one authorized access.
    ///
    /// The access counter is incremented first (the stored bytes are
    /// served), then the content is decrypted if needed and verified
    /// against the recorded digest. Single-use consumption is a separate
    /// step so generation can defer it until the record is finalized.
    pub fn open(
        &self,
        id: &str,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> PipelineResult<OpenedFile> {
        let record = self.metadata.record_access(id, now)?;
        let stored = self.objects.get(&record.object_key)?;

        let bytes = if record.security.encrypted {
            let envelope = record
                .security
                .envelope
                .as_ref()
                .ok_or(crate::vault::VaultError::InconsistentMetadata(
                    "encrypted object without a security envelope",
                ))?;
            let password = password.ok_or_else(|| PipelineError::MissingPassword {
                file_id: id.to_string(),
            })?;

            // The key is derived once here and dropped (zeroized) with this
            // scope; the password itself is never retained.
            let derived = vault::derive(password, Some(envelope.salt_bytes()?));
            vault::decrypt(&stored, derived.key(), &envelope.nonce_bytes()?)?
        } else {
            stored
        };

        if !vault::verify(&bytes, &record.security.digest) {
            return Err(PipelineError::IntegrityMismatch {
                file_id: id.to_string(),
            });
        }

        self.metadata.append_audit(AuditEntry::new(
            id,
            AuditAction::Access,
            "authorized_read",
            now,
        ))?;

        Ok(OpenedFile { record, bytes })
    }

    /// Delete the object and its record after a single-use consumption.
    ///
    /// Returns `true` when this call performed the deletion. Deletion is
    /// synchronous and independent of any configured expiry.
    pub fn consume_if_single_use(
        &self,
        record: &FileRecord,
        now: DateTime<Utc>,
    ) -> PipelineResult<bool> {
        if !record.security.single_use {
            return Ok(false);
        }
        self.delete(&record.id, "single_use_consumed", now)?;
        Ok(true)
    }

    /// Delete object then metadata, appending an audit entry.
    pub fn delete(&self, id: &str, reason: &str, now: DateTime<Utc>) -> PipelineResult<()> {
        let record = self.metadata.file(id)?;
        self.objects.delete(&record.object_key)?;
        // Compare-and-delete; a concurrent consumer may have won.
        if self.metadata.remove_file(id)? {
            self.metadata.append_audit(AuditEntry::new(
                id,
                AuditAction::Delete,
                reason,
                now,
            ))?;
        }
        Ok(())
    }
}
