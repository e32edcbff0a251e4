//! Password key derivation
//!
//! PBKDF2-HMAC-SHA256 with 100k iterations stretches a password into a
//! 256-bit key. Derivation is deterministic for a (password, salt) pair;
//! only the salt is ever persisted. The derived key lives for one request
//! and is wiped on drop.

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

/// Salt length in bytes (32 hex characters on the wire).
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes.
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count.
pub const ITERATIONS: u32 = 100_000;

/// A derived key and the salt it was derived with.
///
/// The key bytes are zeroized on drop and excluded from `Debug` output.
pub struct DerivedKey {
    key: [u8; KEY_LEN],
    salt: [u8; SALT_LEN],
}

impl DerivedKey {
    /// The raw 256-bit key
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// The salt used for derivation
    pub fn salt(&self) -> [u8; SALT_LEN] {
        self.salt
    }

    /// Hex encoding of the salt, the only part that may be persisted
    pub fn salt_hex(&self) -> String {
        hex::encode(self.salt)
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"<redacted>")
            .field("salt", &hex::encode(self.salt))
            .finish()
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive a key from a password.
///
/// When `salt` is omitted a fresh cryptographically random salt is
/// generated, for first-time encryption. Decryption passes the persisted
/// salt back in and gets the same key for the same password.
pub fn derive(password: &str, salt: Option<[u8; SALT_LEN]>) -> DerivedKey {
    let salt = salt.unwrap_or_else(|| {
        let mut fresh = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut fresh);
        fresh
    });

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut key);

    DerivedKey { key, salt }
}
