//! # SHA-256 Hashing
//!
//! Digests for gateway messages. Every protocol message is hashed over its
//! canonical serialized bytes and the digest is kept as lowercase hex.

use sha2::{Digest, Sha256};

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Hash data with SHA-256 and render the digest as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hex_renders_raw_digest() {
        assert_eq!(sha256_hex(b"hello gateway"), hex::encode(sha256(b"hello gateway")));
    }

    #[test]
    fn test_hex_is_64_chars() {
        assert_eq!(sha256_hex(b"").len(), 64);
    }
}
