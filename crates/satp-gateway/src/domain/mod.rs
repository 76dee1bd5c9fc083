//! # Domain Layer
//!
//! Sessions, assets, claims, message types and the error taxonomy.

pub mod asset;
pub mod claims;
pub mod config;
pub mod errors;
pub mod message_type;
pub mod session;

pub use asset::{Asset, LedgerType, NetworkId, TokenType};
pub use claims::{
    AssertionClaim, ClaimKind, ClaimSet, CredentialProfile, LockType, NetworkCapabilities,
    SignatureAlgorithm, TransferClaims,
};
pub use config::{ConfigError, GatewayConfig, SATP_VERSION};
pub use errors::{AssetSide, ErrorClass, SatpError};
pub use message_type::{MessageType, SatpStage};
pub use session::{
    Direction, IntegrityLedger, LedgerEntry, Role, Session, SessionData, SessionState,
};

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
