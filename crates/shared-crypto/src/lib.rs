//! # Shared Crypto - Gateway Primitives
//!
//! Cryptographic building blocks used by the SATP gateway.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Message digests, hash chaining |
//! | `ecdsa` | secp256k1 | Gateway identity and message signatures |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic, so re-signing identical bytes
//!   yields an identical signature
//! - **SHA-256**: digests are rendered as lowercase hex for storage in
//!   session records

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{verify_hex, GatewayKeyPair, GatewayPublicKey, GatewaySignature};
pub use errors::CryptoError;
pub use hashing::{sha256, sha256_hex};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
