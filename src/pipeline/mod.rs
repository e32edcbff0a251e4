//! Pipeline orchestration
//!
//! Ties the vault, the stream accumulator, the normalizer, and the stores
//! together for the two request shapes: file upload/access and tile
//! generation.
//!
//! Failure policy: a per-file failure during multi-file processing is
//! isolated and recorded while the remaining files continue; a
//! pipeline-level failure (malformed document, missing required field,
//! incomplete stream, unavailable upstream) aborts the generation request
//! and surfaces as a terminal error frame.

mod generation;
mod upload;

pub use generation::{
    AttachmentRef, GenerationOutcome, GenerationPipeline, GenerationRequest, SYSTEM_INSTRUCTION,
};
pub use upload::{FileFailure, OpenedFile, UploadBatch, UploadPipeline, UploadRequest};

use forge_protocol::ErrorCode;
use forge_schema::NormalizeError;
use thiserror::Error;

use crate::store::StorageError;
use crate::vault::VaultError;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("upstream closed before the end-of-stream sentinel")]
    IncompleteStream,

    #[error("model endpoint unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("file {file_id} is encrypted and requires a password")]
    MissingPassword { file_id: String },

    #[error("file {file_id} failed content verification")]
    IntegrityMismatch { file_id: String },

    #[error("generation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Wire error code for terminal failure frames.
    ///
    /// `Cancelled` has no code: an abandoned request emits no further
    /// observable frames.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            PipelineError::Vault(_) | PipelineError::MissingPassword { .. } => {
                Some(ErrorCode::DecryptionFailed)
            }
            PipelineError::Normalize(NormalizeError::MalformedDocument(_)) => {
                Some(ErrorCode::MalformedDocument)
            }
            PipelineError::Normalize(NormalizeError::MissingRequiredField(_)) => {
                Some(ErrorCode::MissingRequiredField)
            }
            PipelineError::Storage(_) | PipelineError::IntegrityMismatch { .. } => {
                Some(ErrorCode::StorageError)
            }
            PipelineError::IncompleteStream => Some(ErrorCode::IncompleteStream),
            PipelineError::UpstreamUnavailable(_) => Some(ErrorCode::UpstreamUnavailable),
            PipelineError::Cancelled => None,
            PipelineError::Io(_) => Some(ErrorCode::StorageError),
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Normalize(_) => 10,
            PipelineError::Vault(_)
            | PipelineError::MissingPassword { .. }
            | PipelineError::IntegrityMismatch { .. } => 30,
            PipelineError::Storage(_) => 40,
            PipelineError::IncompleteStream | PipelineError::UpstreamUnavailable(_) => 50,
            PipelineError::Cancelled => 80,
            PipelineError::Io(_) => 1,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PipelineError::IncompleteStream.error_code(),
            Some(ErrorCode::IncompleteStream)
        );
        assert_eq!(
            PipelineError::Vault(VaultError::Decryption).error_code(),
            Some(ErrorCode::DecryptionFailed)
        );
        assert_eq!(PipelineError::Cancelled.error_code(), None);
    }

    #[test]
    fn test_validation_codes_are_distinct_from_storage() {
        let malformed =
            PipelineError::Normalize(NormalizeError::MalformedDocument("x".to_string()));
        let storage = PipelineError::Storage(StorageError::Backend("down".to_string()));
        assert_ne!(malformed.error_code(), storage.error_code());
    }
}
