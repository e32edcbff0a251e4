//! Content digests
//!
//! SHA-256 over the raw bytes, hex-encoded. The digest is computed over the
//! plaintext at upload time, so integrity of an encrypted object is checked
//! after decryption.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of a byte buffer, lowercase hex.
///
/// Empty input has a well-defined digest; it is not an error.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Recompute the digest and compare against `expected`.
///
/// The comparison is exact-length and scans the whole string regardless of
/// where the first mismatch occurs.
pub fn verify(bytes: &[u8], expected: &str) -> bool {
    let computed = digest(bytes);
    let a = computed.as_bytes();
    let b = expected.as_bytes();
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let bytes = b"clarity";
        assert_eq!(digest(bytes), digest(bytes));
        assert_eq!(digest(bytes).len(), 64);
    }

    #[test]
    fn test_empty_input_has_known_digest() {
        assert_eq!(
            digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let bytes = b"some file contents";
        assert!(verify(bytes, &digest(bytes)));
    }

    #[test]
    fn test_single_byte_mutation_fails_verify() {
        let bytes = b"some file contents".to_vec();
        let expected = digest(&bytes);

        for i in 0..bytes.len() {
            let mut mutated = bytes.clone();
            mutated[i] ^= 0x01;
            assert!(!verify(&mutated, &expected), "mutation at byte {i}");
        }
    }

    #[test]
    fn test_verify_rejects_wrong_length() {
        let bytes = b"abc";
        let expected = digest(bytes);
        assert!(!verify(bytes, &expected[..32]));
        assert!(!verify(bytes, ""));
    }
}
