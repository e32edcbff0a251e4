//! Authenticated file encryption
//!
//! AES-256-GCM over a whole byte buffer. Each encryption call generates a
//! fresh random 12-byte nonce; nonce reuse under one key is forbidden, and
//! per-key volume here is low enough that random generation guarantees
//! freshness. Decryption verifies the authentication tag and fails
//! atomically: a wrong key or a tampered ciphertext yields
//! [`VaultError::Decryption`] and no plaintext bytes.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use super::kdf::KEY_LEN;
use super::VaultError;

/// Nonce length in bytes (24 hex characters on the wire).
pub const NONCE_LEN: usize = 12;

/// Encrypt a buffer under `key` with a fresh random nonce.
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<(Vec<u8>, [u8; NONCE_LEN]), VaultError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| VaultError::Cipher)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| VaultError::Cipher)?;

    Ok((ciphertext, nonce_bytes))
}

/// Decrypt a buffer. Tag verification is mandatory; failure is atomic.
pub fn decrypt(
    ciphertext: &[u8],
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>, VaultError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| VaultError::Cipher)?;
    let nonce = Nonce::from_slice(nonce);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::kdf;

    #[test]
    fn test_round_trip() {
        let derived = kdf::derive("secret", None);
        let plaintext = b"ten bytes!";

        let (ciphertext, nonce) = encrypt(plaintext, derived.key()).unwrap();
        assert_ne!(ciphertext.as_slice(), plaintext.as_slice());

        let recovered = decrypt(&ciphertext, derived.key(), &nonce).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn test_wrong_key_fails_atomically() {
        let right = kdf::derive("secret", None);
        let wrong = kdf::derive("wrong", Some(right.salt()));

        let (ciphertext, nonce) = encrypt(b"payload", right.key()).unwrap();
        let err = decrypt(&ciphertext, wrong.key(), &nonce).unwrap_err();
        assert!(matches!(err, VaultError::Decryption));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let derived = kdf::derive("secret", None);
        let (mut ciphertext, nonce) = encrypt(b"payload", derived.key()).unwrap();

        for i in 0..ciphertext.len() {
            ciphertext[i] ^= 0x01;
            assert!(
                decrypt(&ciphertext, derived.key(), &nonce).is_err(),
                "tamper at byte {i} went undetected"
            );
            ciphertext[i] ^= 0x01;
        }
    }

    #[test]
    fn test_nonce_fresh_per_call() {
        let derived = kdf::derive("secret", None);
        let (_, n1) = encrypt(b"same input", derived.key()).unwrap();
        let (_, n2) = encrypt(b"same input", derived.key()).unwrap();
        assert_ne!(n1, n2);
    }

    #[test]
    fn test_empty_plaintext_round_trip() {
        let derived = kdf::derive("secret", None);
        let (ciphertext, nonce) = encrypt(b"", derived.key()).unwrap();
        // Even empty plaintext carries an authentication tag
        assert!(!ciphertext.is_empty());
        assert_eq!(decrypt(&ciphertext, derived.key(), &nonce).unwrap(), b"");
    }
}
