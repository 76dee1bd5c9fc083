//! # SATP Gateway
//!
//! Gateway core of the Secure Asset Transfer Protocol: moves an asset from
//! a ledger on one network to a ledger on another through two gateways
//! exchanging signed, hash-chained messages over four stages.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): sessions, assets, claims, errors
//!   - `Session`: client and server projections of one transfer
//!   - `IntegrityLedger`: per-message-type hash, signature and message
//!   - `GatewayConfig`: identity, networks and lock policy
//!
//! - **Messages** (`messages/`): wire types of stages 0 to 3
//!
//! - **Integrity** (`integrity/`): hashing, signing, hash-chain checks
//!
//! - **Ports Layer** (`ports/`): trait definitions
//!   - `SatpServerApi`: driving port (a counterpart's requests)
//!   - `BridgeClient`, `AuditLog`, `GatewayDirectory`, `GatewayTransport`:
//!     driven ports
//!
//! - **Service Layer** (`service/`): `StageService<Stage, Role>`, the
//!   build and check operations of each stage
//!
//! - **Handler Layer** (`handler/`): server RPCs and client steps
//!
//! - **Manager** (`manager/`): session store, transfer loop, recovery
//!
//! - **Adapters Layer** (`adapters/`): in-memory bridges, audit log,
//!   directory and policies
//!
//! ## Stages
//!
//! | Stage | Exchanges                                          |
//! |-------|----------------------------------------------------|
//! | 0     | new session, pre-SATP transfer                     |
//! | 1     | transfer proposal, transfer commence               |
//! | 2     | lock assertion                                     |
//! | 3     | commit preparation, final assertion, completion    |
//!
//! ## Invariants
//!
//! - Every message after the first carries the stored hash of the message
//!   it answers.
//! - Sequence numbers strictly increase within a session.
//! - A request rebuilt after a crash is byte-identical to the original.
//!
//! ## Usage Example
//!
//! ```ignore
//! use satp_gateway::{SatpManager, ServiceContext, TransferRequest};
//!
//! let manager = SatpManager::new(ServiceContext::new(config, bridges, audit, directory));
//! let session_id = manager.create_session(request)?;
//! let outcome = manager.transfer(&session_id, None).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod handler;
pub mod integrity;
pub mod manager;
pub mod messages;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{
    BridgeRegistry, InMemoryAuditLog, InMemoryLedgerBridge, RejectCounterClaims,
    SameTransferPolicy, StandardProposalPolicy, StaticDirectory,
};
pub use domain::{
    Asset, ConfigError, GatewayConfig, LedgerType, MessageType, NetworkId, Role, SatpError,
    SatpStage, Session, SessionData, SessionState, TokenType,
};
pub use handler::{ClientHandler, ServerHandler};
pub use manager::{
    CrashStatus, ManagerError, SatpManager, SessionStore, TransactError, TransferOutcome,
    TransferProgress, TransferRequest, TransferStatus, TransferStep,
};
pub use messages::{ErrorResponse, SatpMessage};
pub use ports::{
    AuditLog, BridgeClient, BridgeManager, GatewayDirectory, GatewayTransport, SatpServerApi,
    TransportError,
};
pub use service::{ServiceContext, StageService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
