//! Secure file vault
//!
//! The file-security core: content digests, password key derivation,
//! authenticated encryption, and the security metadata persisted alongside
//! each uploaded object.

mod cipher;
mod digest;
mod kdf;

pub use cipher::{decrypt, encrypt, NONCE_LEN};
pub use digest::{digest, verify};
pub use kdf::{derive, DerivedKey, ITERATIONS, KEY_LEN, SALT_LEN};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::retention::RetentionClass;

/// Errors from vault operations
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Cipher construction or encryption failed
    #[error("cipher operation failed")]
    Cipher,

    /// Wrong password or corrupted ciphertext; no partial plaintext
    #[error("decryption failed: ciphertext rejected")]
    Decryption,

    /// A persisted hex field does not decode
    #[error("invalid hex encoding in {field}")]
    InvalidHex { field: &'static str },

    /// A decoded field has the wrong length
    #[error("invalid {field} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Metadata violates the encrypted-implies-envelope invariant
    #[error("security metadata is inconsistent: {0}")]
    InconsistentMetadata(&'static str),
}

/// Persisted salt and nonce for an encrypted object.
///
/// Present iff the object is encrypted. Both values are public; neither the
/// password nor the derived key is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEnvelope {
    /// Hex-encoded 16-byte KDF salt
    pub salt: String,

    /// Hex-encoded 12-byte AEAD nonce
    pub nonce: String,
}

impl SecurityEnvelope {
    pub fn new(salt: [u8; SALT_LEN], nonce: [u8; NONCE_LEN]) -> Self {
        Self {
            salt: hex::encode(salt),
            nonce: hex::encode(nonce),
        }
    }

    /// Decode the salt back to raw bytes
    pub fn salt_bytes(&self) -> Result<[u8; SALT_LEN], VaultError> {
        decode_fixed(&self.salt, "salt")
    }

    /// Decode the nonce back to raw bytes
    pub fn nonce_bytes(&self) -> Result<[u8; NONCE_LEN], VaultError> {
        decode_fixed(&self.nonce, "nonce")
    }
}

fn decode_fixed<const N: usize>(value: &str, field: &'static str) -> Result<[u8; N], VaultError> {
    let bytes = hex::decode(value).map_err(|_| VaultError::InvalidHex { field })?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| VaultError::InvalidLength {
            field,
            expected: N,
            actual,
        })
}

/// Security metadata created once at upload completion.
///
/// Invariants: `encrypted` implies the envelope is present with non-empty
/// salt and nonce; `single_use` makes `expires_at` irrelevant, since the
/// object is deleted immediately after its one authorized use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSecurityMetadata {
    /// SHA-256 hex digest of the plaintext content
    pub digest: String,

    /// Whether the stored object is ciphertext
    pub encrypted: bool,

    /// Salt/nonce pair, present iff encrypted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope: Option<SecurityEnvelope>,

    /// Retention class chosen at upload
    pub retention_class: RetentionClass,

    /// Absolute expiry instant; absent means never
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Deleted on consumption rather than by elapsed time
    pub single_use: bool,
}

impl FileSecurityMetadata {
    /// Build metadata for a plaintext object.
    pub fn plaintext(digest: String, retention: RetentionClass, now: DateTime<Utc>) -> Self {
        Self {
            digest,
            encrypted: false,
            envelope: None,
            retention_class: retention,
            expires_at: retention.expiry_for(now),
            single_use: retention == RetentionClass::SingleUse,
        }
    }

    /// Build metadata for an encrypted object.
    pub fn encrypted(
        digest: String,
        envelope: SecurityEnvelope,
        retention: RetentionClass,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            digest,
            encrypted: true,
            envelope: Some(envelope),
            retention_class: retention,
            expires_at: retention.expiry_for(now),
            single_use: retention == RetentionClass::SingleUse,
        }
    }

    /// Check the structural invariant.
    pub fn validate(&self) -> Result<(), VaultError> {
        match (&self.encrypted, &self.envelope) {
            (true, None) => Err(VaultError::InconsistentMetadata(
                "encrypted object without a security envelope",
            )),
            (true, Some(env)) if env.salt.is_empty() || env.nonce.is_empty() => Err(
                VaultError::InconsistentMetadata("security envelope with empty salt or nonce"),
            ),
            (false, Some(_)) => Err(VaultError::InconsistentMetadata(
                "plaintext object carrying a security envelope",
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-03-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_plaintext_metadata_has_no_envelope() {
        let meta =
            FileSecurityMetadata::plaintext(digest(b"x"), RetentionClass::SevenDays, now());
        assert!(!meta.encrypted);
        assert!(meta.envelope.is_none());
        assert!(!meta.single_use);
        assert!(meta.expires_at.is_some());
        meta.validate().unwrap();
    }

    #[test]
    fn test_encrypted_metadata_round_trip() {
        let envelope = SecurityEnvelope::new([1u8; SALT_LEN], [2u8; NONCE_LEN]);
        let meta = FileSecurityMetadata::encrypted(
            digest(b"x"),
            envelope,
            RetentionClass::OneDay,
            now(),
        );
        meta.validate().unwrap();

        let env = meta.envelope.as_ref().unwrap();
        assert_eq!(env.salt.len(), 32);
        assert_eq!(env.nonce.len(), 24);
        assert_eq!(env.salt_bytes().unwrap(), [1u8; SALT_LEN]);
        assert_eq!(env.nonce_bytes().unwrap(), [2u8; NONCE_LEN]);
    }

    #[test]
    fn test_single_use_has_no_expiry() {
        let meta =
            FileSecurityMetadata::plaintext(digest(b"x"), RetentionClass::SingleUse, now());
        assert!(meta.single_use);
        assert!(meta.expires_at.is_none());
    }

    #[test]
    fn test_invariant_violations_detected() {
        let mut meta =
            FileSecurityMetadata::plaintext(digest(b"x"), RetentionClass::SevenDays, now());
        meta.encrypted = true;
        assert!(meta.validate().is_err());

        meta.envelope = Some(SecurityEnvelope {
            salt: String::new(),
            nonce: "aa".to_string(),
        });
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_envelope_serialization_shape() {
        let envelope = SecurityEnvelope::new([0u8; SALT_LEN], [0u8; NONCE_LEN]);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["salt"].as_str().unwrap().len(), 32);
        assert_eq!(json["nonce"].as_str().unwrap().len(), 24);
    }

    #[test]
    fn test_bad_hex_rejected() {
        let envelope = SecurityEnvelope {
            salt: "zz".repeat(16),
            nonce: "aa".repeat(12),
        };
        assert!(matches!(
            envelope.salt_bytes(),
            Err(VaultError::InvalidHex { field: "salt" })
        ));

        let short = SecurityEnvelope {
            salt: "aa".repeat(8),
            nonce: "aa".repeat(12),
        };
        assert!(matches!(
            short.salt_bytes(),
            Err(VaultError::InvalidLength { field: "salt", .. })
        ));
    }
}
