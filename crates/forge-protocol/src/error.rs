//! Error Code Registry
//!
//! Stable string codes surfaced at the wire boundary. The caller sees a code
//! and a single-line message; internals (buffers, key material, stack
//! traces) never cross this boundary.

/// Standard error codes for terminal failure frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Accumulated document is not one well-formed JSON object
    MalformedDocument,
    /// Document lacks a mandatory field
    MissingRequiredField,
    /// Ciphertext rejected: wrong password or corrupted data
    DecryptionFailed,
    /// Upstream closed before delivering the end-of-stream sentinel
    IncompleteStream,
    /// Upstream returned a non-success status before any data
    UpstreamUnavailable,
    /// External store failure
    StorageError,
}

impl ErrorCode {
    /// Returns the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MalformedDocument => "MALFORMED_DOCUMENT",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::DecryptionFailed => "DECRYPTION_FAILED",
            ErrorCode::IncompleteStream => "INCOMPLETE_STREAM",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::StorageError => "STORAGE_ERROR",
        }
    }

    /// True for failures that abort a whole generation request, as opposed
    /// to per-file failures that are isolated and recorded.
    pub fn aborts_request(&self) -> bool {
        matches!(
            self,
            ErrorCode::MalformedDocument
                | ErrorCode::MissingRequiredField
                | ErrorCode::IncompleteStream
                | ErrorCode::UpstreamUnavailable
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
