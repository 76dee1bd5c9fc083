//! # ECDSA Gateway Keys (secp256k1)
//!
//! Every gateway owns one secp256k1 key pair. The public half is its identity
//! on the wire (compressed SEC1, hex encoded); the private half signs every
//! protocol message the gateway emits.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces: signing the same bytes twice gives the
//!   same signature, which keeps rebuilt messages byte-identical
//! - Low-S normalization
//! - Secret material zeroized on drop

use std::fmt;

use crate::CryptoError;
use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use zeroize::Zeroize;

/// Length of a compressed SEC1 public key.
pub const PUBLIC_KEY_LEN: usize = 33;

/// Length of an `r || s` signature.
pub const SIGNATURE_LEN: usize = 64;

/// Compressed secp256k1 public key identifying a gateway.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GatewayPublicKey([u8; PUBLIC_KEY_LEN]);

impl GatewayPublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Parse a hex-encoded compressed key.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let raw = hex::decode(encoded)?;
        let bytes: [u8; PUBLIC_KEY_LEN] =
            raw.as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: PUBLIC_KEY_LEN,
                    actual: raw.len(),
                })?;
        Self::from_bytes(bytes)
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Hex rendering used in protocol messages.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &GatewaySignature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_slice(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl fmt::Debug for GatewayPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GatewayPublicKey({})", self.to_hex())
    }
}

impl fmt::Display for GatewayPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewaySignature([u8; SIGNATURE_LEN]);

impl GatewaySignature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded signature.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let raw = hex::decode(encoded)?;
        let bytes: [u8; SIGNATURE_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Hex rendering used in protocol messages.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// secp256k1 key pair held by a gateway.
#[derive(Clone)]
pub struct GatewayKeyPair {
    signing_key: SigningKey,
}

impl GatewayKeyPair {
    /// Generate a random key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Create from a hex-encoded secret key.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let mut raw = hex::decode(encoded)?;
        let result = match <[u8; 32]>::try_from(raw.as_slice()) {
            Ok(bytes) => Self::from_bytes(bytes),
            Err(_) => Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: raw.len(),
            }),
        };
        raw.zeroize();
        result
    }

    /// Get the compressed public key.
    pub fn public_key(&self) -> GatewayPublicKey {
        let encoded = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes.copy_from_slice(encoded.as_bytes());
        GatewayPublicKey(bytes)
    }

    /// Sign a message (deterministic RFC 6979).
    pub fn sign(&self, message: &[u8]) -> GatewaySignature {
        let sig: Signature = self.signing_key.sign(message);
        let bytes: [u8; SIGNATURE_LEN] = sig.to_bytes().into();
        GatewaySignature(bytes)
    }

    /// Sign and return the hex rendering.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        self.sign(message).to_hex()
    }
}

impl fmt::Debug for GatewayKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayKeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl Drop for GatewayKeyPair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

/// Verify a hex signature against a hex public key.
pub fn verify_hex(public_key: &str, message: &[u8], signature: &str) -> Result<(), CryptoError> {
    let key = GatewayPublicKey::from_hex(public_key)?;
    let sig = GatewaySignature::from_hex(signature)?;
    key.verify(message, &sig)
}
