//! # Domain Errors
//!
//! Every protocol failure is a `SatpError`. Each variant belongs to exactly
//! one `ErrorClass`, which decides whether the transfer may be resumed.

use shared_crypto::CryptoError;
use thiserror::Error;

use super::claims::ClaimKind;
use super::message_type::MessageType;
use super::session::Role;

/// Error taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// A required field is absent.
    Structural,
    /// Signature, hash chain, sequence or identity mismatch.
    Integrity,
    /// The counterpart declined or cannot serve the transfer.
    Negotiation,
    /// Transport, bridge or persistence failure.
    Infrastructure,
    /// Caller bug: unknown session, wrong role, closed session.
    Contract,
}

/// Which side of the transfer an asset belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetSide {
    /// Asset on the sender ledger.
    Sender,
    /// Asset on the receiver ledger.
    Receiver,
}

impl std::fmt::Display for AssetSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetSide::Sender => f.write_str("sender"),
            AssetSide::Receiver => f.write_str("receiver"),
        }
    }
}

/// Protocol error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SatpError {
    // ----- structural -----
    /// Required message or session field is empty.
    #[error("Missing required parameter: {field}")]
    MissingParameter {
        /// Offending field name.
        field: &'static str,
    },

    /// Required assertion claim is absent.
    #[error("Missing assertion claim: {claim}")]
    MissingClaim {
        /// Claim kind.
        claim: ClaimKind,
    },

    /// Asset descriptor is absent.
    #[error("Missing {side} asset")]
    LedgerAsset {
        /// Which asset.
        side: AssetSide,
    },

    /// Asset descriptor has no token id.
    #[error("Missing {side} asset token id")]
    LedgerAssetId {
        /// Which asset.
        side: AssetSide,
    },

    /// Asset has no interaction ontology.
    #[error("Missing ontology for {side} asset contract")]
    OntologyContract {
        /// Which asset.
        side: AssetSide,
    },

    /// Transfer claims could not be assembled.
    #[error("Invalid transfer init claims: {0}")]
    TransferInitClaims(String),

    /// Network capabilities are absent or malformed.
    #[error("Invalid network capabilities: {0}")]
    NetworkCapabilities(String),

    // ----- integrity -----
    /// Protocol version differs.
    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Local version.
        expected: String,
        /// Message version.
        actual: String,
    },

    /// Message type is not the one expected at this step.
    #[error("Unexpected message type: expected {expected}, got {actual}")]
    MessageTypeMismatch {
        /// Accepted type(s).
        expected: String,
        /// Received type.
        actual: MessageType,
    },

    /// Sequence number is not `last + 1`.
    #[error("Sequence number mismatch: expected {expected}, got {actual}")]
    SequenceNumber {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        actual: u64,
    },

    /// `hashPreviousMessage` differs from the stored hash.
    #[error("Hash chain broken at {message_type}: expected {expected}, got {actual}")]
    HashChain {
        /// Message being checked.
        message_type: MessageType,
        /// Stored hash of the predecessor.
        expected: String,
        /// Hash carried by the message.
        actual: String,
    },

    /// Client gateway public key differs from the session's.
    #[error("Client gateway public key mismatch")]
    ClientPubkey,

    /// Server gateway public key differs from the session's.
    #[error("Server gateway public key mismatch")]
    ServerPubkey,

    /// Transfer context differs from the session's.
    #[error("Transfer context mismatch: expected {expected}, got {actual}")]
    TransferContextId {
        /// Session context.
        expected: String,
        /// Message context.
        actual: String,
    },

    /// Message carries no signature.
    #[error("Signature missing on {message_type}")]
    SignatureMissing {
        /// Message type.
        message_type: MessageType,
    },

    /// Signature does not verify.
    #[error("Signature verification failed on {message_type}")]
    SignatureVerification {
        /// Message type.
        message_type: MessageType,
    },

    /// Commence carries a claims hash different from the proposal's.
    #[error("Transfer init claims hash mismatch")]
    TransferInitClaimsHash,

    /// Completion carries a commence hash different from the stored one.
    #[error("Transfer commence hash mismatch")]
    TransferCommenceHash,

    /// Session id collides with an existing session.
    #[error("Session id mismatch: {session_id}")]
    SessionMissMatch {
        /// Colliding session id.
        session_id: String,
    },

    /// Key or signature material is malformed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    // ----- negotiation -----
    /// Network is not served by this gateway.
    #[error("Network not supported: {0}")]
    NetworkNotSupported(String),

    /// Lock assertion arrived after the lock expired.
    #[error("Lock expired at {0}")]
    LockExpired(u64),

    /// Counterpart answered with an error response.
    #[error("Counterpart rejected {message_type} with code {code}: {reason}")]
    Rejected {
        /// Request that was rejected.
        message_type: MessageType,
        /// Remote error code.
        code: u32,
        /// Remote reason.
        reason: String,
    },

    // ----- infrastructure -----
    /// Bridge operation failed.
    #[error("Bridge {operation} failed: {reason}")]
    Bridge {
        /// Operation name.
        operation: &'static str,
        /// Failure reason.
        reason: String,
    },

    /// No bridge is registered for the network.
    #[error("No bridge for network {0}")]
    BridgeNotFound(String),

    /// Message serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    // ----- contract -----
    /// Session does not exist.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session does not hold the requested role.
    #[error("Session does not hold {expected:?} data")]
    SessionRole {
        /// Requested role.
        expected: Role,
    },

    /// Session already completed.
    #[error("Session already completed: {0}")]
    SessionCompleted(String),

    /// Session was rejected or failed.
    #[error("Session is closed: {0}")]
    SessionClosed(String),

    /// Session data lacks a field the operation needs.
    #[error("Session data not available: {0}")]
    SessionData(String),

    /// Gateway identity unknown to the directory.
    #[error("Unknown gateway: {0}")]
    UnknownGateway(String),
}

impl SatpError {
    /// Taxonomy class of the error.
    pub fn class(&self) -> ErrorClass {
        use SatpError::*;
        match self {
            MissingParameter { .. }
            | MissingClaim { .. }
            | LedgerAsset { .. }
            | LedgerAssetId { .. }
            | OntologyContract { .. }
            | TransferInitClaims(_)
            | NetworkCapabilities(_) => ErrorClass::Structural,
            VersionMismatch { .. }
            | MessageTypeMismatch { .. }
            | SequenceNumber { .. }
            | HashChain { .. }
            | ClientPubkey
            | ServerPubkey
            | TransferContextId { .. }
            | SignatureMissing { .. }
            | SignatureVerification { .. }
            | TransferInitClaimsHash
            | TransferCommenceHash
            | SessionMissMatch { .. }
            | Crypto(_) => ErrorClass::Integrity,
            NetworkNotSupported(_) | LockExpired(_) | Rejected { .. } => ErrorClass::Negotiation,
            Bridge { .. } | BridgeNotFound(_) | Serialization(_) => ErrorClass::Infrastructure,
            SessionNotFound(_)
            | SessionRole { .. }
            | SessionCompleted(_)
            | SessionClosed(_)
            | SessionData(_)
            | UnknownGateway(_) => ErrorClass::Contract,
        }
    }

    /// Stable numeric code carried in error responses.
    pub fn code(&self) -> u32 {
        use SatpError::*;
        match self {
            MissingParameter { .. } => 100,
            MissingClaim { .. } => 101,
            LedgerAsset { .. } => 102,
            LedgerAssetId { .. } => 103,
            OntologyContract { .. } => 104,
            TransferInitClaims(_) => 105,
            NetworkCapabilities(_) => 106,
            VersionMismatch { .. } => 200,
            MessageTypeMismatch { .. } => 201,
            SequenceNumber { .. } => 202,
            HashChain { .. } => 203,
            ClientPubkey => 204,
            ServerPubkey => 205,
            TransferContextId { .. } => 206,
            SignatureMissing { .. } => 207,
            SignatureVerification { .. } => 208,
            TransferInitClaimsHash => 209,
            TransferCommenceHash => 210,
            SessionMissMatch { .. } => 211,
            Crypto(_) => 212,
            NetworkNotSupported(_) => 300,
            LockExpired(_) => 301,
            Rejected { code, .. } => *code,
            Bridge { .. } => 400,
            BridgeNotFound(_) => 401,
            Serialization(_) => 402,
            SessionNotFound(_) => 500,
            SessionRole { .. } => 501,
            SessionCompleted(_) => 502,
            SessionClosed(_) => 503,
            SessionData(_) => 504,
            UnknownGateway(_) => 505,
        }
    }

    /// Whether resuming the transfer may succeed without operator action.
    pub fn is_recoverable(&self) -> bool {
        self.class() == ErrorClass::Infrastructure
    }

    /// Whether the error must mark the session as failed.
    pub fn is_fatal_for_session(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Structural | ErrorClass::Integrity | ErrorClass::Negotiation
        )
    }
}

impl From<serde_json::Error> for SatpError {
    fn from(err: serde_json::Error) -> Self {
        SatpError::Serialization(err.to_string())
    }
}
