//! # Message Integrity
//!
//! Hashing, signing and the ledger bookkeeping that turns individual
//! messages into a hash chain.
//!
//! - hash: SHA-256 over the canonical JSON of the message as sent
//! - signature: secp256k1 over the canonical JSON with both signature
//!   slots empty

pub mod verifier;

pub use verifier::MessageVerifier;

use shared_crypto::{sha256_hex, verify_hex, CryptoError, GatewayKeyPair};

use crate::domain::{
    now_millis, Direction, LedgerEntry, Role, SatpError, SessionData, TransferClaims,
};
use crate::messages::ProtocolMessage;

/// SHA-256 (hex) of the message as sent.
pub fn message_hash<M: ProtocolMessage>(message: &M) -> Result<String, SatpError> {
    Ok(sha256_hex(&serde_json::to_vec(message)?))
}

/// Bytes covered by a message signature.
pub fn signing_payload<M: ProtocolMessage>(message: &M) -> Result<Vec<u8>, SatpError> {
    let mut unsigned = message.clone();
    unsigned.header_mut().clear_signatures();
    Ok(serde_json::to_vec(&unsigned)?)
}

/// Sign `message` as `role`, filling that role's signature slot.
pub fn sign_message<M: ProtocolMessage>(
    message: &mut M,
    signer: &GatewayKeyPair,
    role: Role,
) -> Result<String, SatpError> {
    let payload = signing_payload(message)?;
    let signature = signer.sign_hex(&payload);
    message.header_mut().set_signature(role, signature.clone());
    Ok(signature)
}

/// Verify the signature `sender` placed on `message`.
pub fn verify_message_signature<M: ProtocolMessage>(
    message: &M,
    sender: Role,
    public_key: &str,
) -> Result<(), SatpError> {
    let message_type = message.message_type();
    let signature = message.header().signature(sender);
    if signature.is_empty() {
        return Err(SatpError::SignatureMissing { message_type });
    }

    let payload = signing_payload(message)?;
    verify_hex(public_key, &payload, signature).map_err(|err| match err {
        CryptoError::SignatureVerificationFailed
        | CryptoError::InvalidSignature
        | CryptoError::InvalidHex(_) => SatpError::SignatureVerification { message_type },
        other => SatpError::Crypto(other),
    })
}

/// Signature over a bridge receipt.
pub fn sign_receipt(signer: &GatewayKeyPair, receipt: &str) -> String {
    signer.sign_hex(receipt.as_bytes())
}

/// SHA-256 (hex) of a claims structure.
pub fn hash_claims(claims: &TransferClaims) -> Result<String, SatpError> {
    Ok(sha256_hex(&serde_json::to_vec(claims)?))
}

/// Append `message` to the session's integrity ledger.
///
/// Returns the stored hash. Advances `last_sequence_number` to the
/// message's sequence number.
pub fn record_message<M: ProtocolMessage>(
    data: &mut SessionData,
    message: &M,
    direction: Direction,
    signer: Role,
) -> Result<String, SatpError> {
    let hash = message_hash(message)?;
    let header = message.header();
    data.ledger.record(
        header.message_type,
        LedgerEntry {
            hash: hash.clone(),
            signature: header.signature(signer).to_string(),
            message: message.clone().into_envelope(),
            direction,
            recorded_at: now_millis(),
        },
    );
    data.last_sequence_number = header.sequence_number;
    Ok(hash)
}
