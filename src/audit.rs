//! File audit trail
//!
//! One entry per security-relevant file action, appended through the
//! metadata store. Reasons are short machine-friendly strings
//! (`single_use_consumed`, `automatic_expiry`, `user_request`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audited file actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Upload,
    Access,
    Delete,
}

/// One audit entry for a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// File the action applied to
    pub file_id: String,

    /// What happened
    pub action: AuditAction,

    /// Why it happened
    pub reason: String,

    /// When it happened
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        file_id: impl Into<String>,
        action: AuditAction,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            action,
            reason: reason.into(),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_casing() {
        assert_eq!(
            serde_json::to_string(&AuditAction::Delete).unwrap(),
            "\"DELETE\""
        );
        assert_eq!(
            serde_json::to_string(&AuditAction::Upload).unwrap(),
            "\"UPLOAD\""
        );
    }
}
