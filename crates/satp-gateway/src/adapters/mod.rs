//! # Adapters
//!
//! In-process implementations of the outbound ports.

pub mod audit_log;
pub mod bridge_registry;
pub mod directory;
pub mod ledger_bridge;
pub mod policies;

pub use audit_log::InMemoryAuditLog;
pub use bridge_registry::BridgeRegistry;
pub use directory::StaticDirectory;
pub use ledger_bridge::{InMemoryLedgerBridge, WrappedAsset};
pub use policies::{RejectCounterClaims, SameTransferPolicy, StandardProposalPolicy};
