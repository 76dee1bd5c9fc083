//! # Outbound Ports
//!
//! Collaborators the gateway core drives: ledger bridges, the audit log,
//! the gateway directory, the transport to the counterpart, and the
//! policies that judge proposals.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::inbound::SatpServerApi;
use crate::domain::{
    Asset, LedgerType, MessageType, NetworkCapabilities, NetworkId, SatpError, TransferClaims,
};
use crate::messages::*;

// =============================================================================
// Bridge
// =============================================================================

/// Failure reported by a bridge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation}: {reason}")]
pub struct BridgeError {
    /// Operation that failed.
    pub operation: &'static str,
    /// Reason given by the ledger connector.
    pub reason: String,
}

impl From<BridgeError> for SatpError {
    fn from(err: BridgeError) -> Self {
        SatpError::Bridge {
            operation: err.operation,
            reason: err.reason,
        }
    }
}

/// Ledger bridge - outbound port.
///
/// Every call returns an opaque receipt; the core never interprets it.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Ledger family served by this bridge.
    fn network_type(&self) -> LedgerType;

    /// Format tag of the receipts this bridge emits.
    fn receipt_format(&self) -> String;

    /// Register the asset with the bridge's wrapper contract.
    async fn wrap_asset(&self, asset: &Asset) -> Result<String, BridgeError>;

    /// Lock `amount` of the asset.
    async fn lock_asset(&self, asset_id: &str, amount: u64) -> Result<String, BridgeError>;

    /// Mint `amount` of the asset.
    async fn mint_asset(&self, asset_id: &str, amount: u64) -> Result<String, BridgeError>;

    /// Burn `amount` of the asset.
    async fn burn_asset(&self, asset_id: &str, amount: u64) -> Result<String, BridgeError>;

    /// Assign `amount` of the asset to `recipient`.
    async fn assign_asset(
        &self,
        asset_id: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<String, BridgeError>;

    /// Ledger proof for the latest operation on the asset.
    async fn get_proof(&self, asset_id: &str) -> Result<String, BridgeError>;
}

/// Resolves the bridge serving a network - outbound port.
pub trait BridgeManager: Send + Sync {
    /// Bridge for `network`, if one is registered.
    fn bridge(&self, network: &NetworkId) -> Option<Arc<dyn BridgeClient>>;

    /// Networks with a registered bridge.
    fn networks(&self) -> Vec<NetworkId>;
}

// =============================================================================
// Audit log
// =============================================================================

/// Lifecycle checkpoint of a logged operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOperation {
    /// Operation started.
    Init,
    /// External side effect in progress.
    Exec,
    /// Operation finished.
    Done,
    /// Operation failed.
    Fail,
}

impl fmt::Display for LogOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogOperation::Init => "init",
            LogOperation::Exec => "exec",
            LogOperation::Done => "done",
            LogOperation::Fail => "fail",
        };
        f.write_str(name)
    }
}

/// Audit record of one checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Session id.
    pub session_id: String,
    /// Message type being processed.
    pub message_type: MessageType,
    /// Checkpoint.
    pub operation: LogOperation,
    /// Free-form payload (usually the message hash).
    pub data: String,
    /// Sequence number at the time of the checkpoint.
    pub sequence_number: u64,
    /// Unix millis.
    pub timestamp: u64,
}

/// Proof record of a bridge claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofEntry {
    /// Session id.
    pub session_id: String,
    /// Message type the proof belongs to.
    pub message_type: MessageType,
    /// Operation that produced the proof.
    pub operation: String,
    /// Proof payload.
    pub data: String,
}

/// Audit log failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("audit log unavailable: {0}")]
pub struct AuditError(pub String);

/// Append-only audit log - outbound port.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append a checkpoint.
    async fn persist_log_entry(&self, entry: LogEntry) -> Result<(), AuditError>;

    /// Append a proof.
    async fn store_proof(&self, proof: ProofEntry) -> Result<(), AuditError>;

    /// Most recent checkpoint of a session.
    async fn latest_entry(&self, session_id: &str) -> Result<Option<LogEntry>, AuditError>;
}

// =============================================================================
// Directory and transport
// =============================================================================

/// Transport failure as seen by the client.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// The counterpart processed the request and answered with an error.
    #[error("remote error {}: {}", .0.error_code, .0.reason)]
    Remote(ErrorResponse),

    /// The counterpart could not be reached.
    #[error("counterpart unavailable: {0}")]
    Unavailable(String),

    /// No answer within the deadline.
    #[error("request timed out")]
    Timeout,
}

impl TransportError {
    /// Whether the counterpart may not have seen the request.
    pub fn is_interruption(&self) -> bool {
        !matches!(self, TransportError::Remote(_))
    }
}

/// Channel to a counterpart gateway's server handler - outbound port.
///
/// Mirrors `SatpServerApi`, with transport failures added.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Stage 0: open a session.
    async fn new_session(
        &self,
        request: NewSessionRequest,
    ) -> Result<NewSessionResponse, TransportError>;

    /// Stage 0: pre-transfer exchange.
    async fn pre_satp_transfer(
        &self,
        request: PreSatpTransferRequest,
    ) -> Result<PreSatpTransferResponse, TransportError>;

    /// Stage 1: proposal.
    async fn transfer_proposal(
        &self,
        request: TransferProposalRequest,
    ) -> Result<TransferProposalReceipt, TransportError>;

    /// Stage 1: commence.
    async fn transfer_commence(
        &self,
        request: TransferCommenceRequest,
    ) -> Result<TransferCommenceResponse, TransportError>;

    /// Stage 2: lock assertion.
    async fn lock_assertion(
        &self,
        request: LockAssertionRequest,
    ) -> Result<LockAssertionReceipt, TransportError>;

    /// Stage 3: commit preparation.
    async fn commit_preparation(
        &self,
        request: CommitPreparationRequest,
    ) -> Result<CommitReadyResponse, TransportError>;

    /// Stage 3: final assertion.
    async fn commit_final_assertion(
        &self,
        request: CommitFinalAssertionRequest,
    ) -> Result<CommitFinalAcknowledgementReceipt, TransportError>;

    /// Stage 3: completion.
    async fn transfer_complete(
        &self,
        request: TransferCompleteRequest,
    ) -> Result<TransferCompleteResponse, TransportError>;
}

/// Known gateways - outbound port.
pub trait GatewayDirectory: Send + Sync {
    /// Public key (hex) of a gateway.
    fn public_key(&self, gateway_id: &str) -> Option<String>;

    /// Channel to a gateway's server handler.
    fn channel(&self, gateway_id: &str) -> Option<Arc<dyn GatewayTransport>>;
}

/// Every server handler is also reachable in-process.
#[async_trait]
impl<T: SatpServerApi + ?Sized> GatewayTransport for T {
    async fn new_session(
        &self,
        request: NewSessionRequest,
    ) -> Result<NewSessionResponse, TransportError> {
        SatpServerApi::new_session(self, request)
            .await
            .map_err(TransportError::Remote)
    }

    async fn pre_satp_transfer(
        &self,
        request: PreSatpTransferRequest,
    ) -> Result<PreSatpTransferResponse, TransportError> {
        SatpServerApi::pre_satp_transfer(self, request)
            .await
            .map_err(TransportError::Remote)
    }

    async fn transfer_proposal(
        &self,
        request: TransferProposalRequest,
    ) -> Result<TransferProposalReceipt, TransportError> {
        SatpServerApi::transfer_proposal(self, request)
            .await
            .map_err(TransportError::Remote)
    }

    async fn transfer_commence(
        &self,
        request: TransferCommenceRequest,
    ) -> Result<TransferCommenceResponse, TransportError> {
        SatpServerApi::transfer_commence(self, request)
            .await
            .map_err(TransportError::Remote)
    }

    async fn lock_assertion(
        &self,
        request: LockAssertionRequest,
    ) -> Result<LockAssertionReceipt, TransportError> {
        SatpServerApi::lock_assertion(self, request)
            .await
            .map_err(TransportError::Remote)
    }

    async fn commit_preparation(
        &self,
        request: CommitPreparationRequest,
    ) -> Result<CommitReadyResponse, TransportError> {
        SatpServerApi::commit_preparation(self, request)
            .await
            .map_err(TransportError::Remote)
    }

    async fn commit_final_assertion(
        &self,
        request: CommitFinalAssertionRequest,
    ) -> Result<CommitFinalAcknowledgementReceipt, TransportError> {
        SatpServerApi::commit_final_assertion(self, request)
            .await
            .map_err(TransportError::Remote)
    }

    async fn transfer_complete(
        &self,
        request: TransferCompleteRequest,
    ) -> Result<TransferCompleteResponse, TransportError> {
        SatpServerApi::transfer_complete(self, request)
            .await
            .map_err(TransportError::Remote)
    }
}

// =============================================================================
// Policies
// =============================================================================

/// Server verdict on a transfer proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProposalDecision {
    /// Answer `INIT_RECEIPT`.
    Accept,
    /// Answer `INIT_REJECT` without counter-claims.
    Reject(String),
    /// Answer `INIT_REJECT` proposing different claims.
    Counter(TransferClaims),
}

/// Judges incoming proposals on the server side.
pub trait ProposalPolicy: Send + Sync {
    /// Decide on a proposal.
    fn evaluate(
        &self,
        claims: &TransferClaims,
        capabilities: &NetworkCapabilities,
    ) -> ProposalDecision;
}

impl<F> ProposalPolicy for F
where
    F: Fn(&TransferClaims, &NetworkCapabilities) -> ProposalDecision + Send + Sync,
{
    fn evaluate(
        &self,
        claims: &TransferClaims,
        capabilities: &NetworkCapabilities,
    ) -> ProposalDecision {
        self(claims, capabilities)
    }
}

/// Judges counter-claims on the client side.
pub trait CounterClaimPolicy: Send + Sync {
    /// Whether to continue the transfer under `counter` instead of `proposed`.
    fn accept(&self, proposed: &TransferClaims, counter: &TransferClaims) -> bool;
}

impl<F> CounterClaimPolicy for F
where
    F: Fn(&TransferClaims, &TransferClaims) -> bool + Send + Sync,
{
    fn accept(&self, proposed: &TransferClaims, counter: &TransferClaims) -> bool {
        self(proposed, counter)
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock bridge returning fixed receipts.
///
/// Counts every ledger-changing call and can be told to fail one operation.
pub struct MockBridge {
    ledger_type: LedgerType,
    fail_on: parking_lot::RwLock<Option<&'static str>>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockBridge {
    /// Mock for a ledger family.
    pub fn new(ledger_type: LedgerType) -> Self {
        Self {
            ledger_type,
            fail_on: parking_lot::RwLock::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Fail every call of `operation` (e.g. `"lock"`) until cleared.
    pub fn fail_on(&self, operation: Option<&'static str>) {
        *self.fail_on.write() = operation;
    }

    /// Number of ledger-changing calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn receipt(&self, operation: &'static str, asset_id: &str, amount: u64) -> Result<String, BridgeError> {
        if *self.fail_on.read() == Some(operation) {
            return Err(BridgeError {
                operation,
                reason: "Mock failure".to_string(),
            });
        }
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(format!("{operation}:{asset_id}:{amount}"))
    }
}

#[async_trait]
impl BridgeClient for MockBridge {
    fn network_type(&self) -> LedgerType {
        self.ledger_type
    }

    fn receipt_format(&self) -> String {
        "mock".to_string()
    }

    async fn wrap_asset(&self, asset: &Asset) -> Result<String, BridgeError> {
        self.receipt("wrap", &asset.token_id, asset.amount)
    }

    async fn lock_asset(&self, asset_id: &str, amount: u64) -> Result<String, BridgeError> {
        self.receipt("lock", asset_id, amount)
    }

    async fn mint_asset(&self, asset_id: &str, amount: u64) -> Result<String, BridgeError> {
        self.receipt("mint", asset_id, amount)
    }

    async fn burn_asset(&self, asset_id: &str, amount: u64) -> Result<String, BridgeError> {
        self.receipt("burn", asset_id, amount)
    }

    async fn assign_asset(
        &self,
        asset_id: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<String, BridgeError> {
        self.receipt("assign", asset_id, amount)
            .map(|receipt| format!("{receipt}:{recipient}"))
    }

    async fn get_proof(&self, asset_id: &str) -> Result<String, BridgeError> {
        Ok(format!("proof:{asset_id}"))
    }
}

/// Bridge manager serving one bridge for every network.
pub struct MockBridgeManager {
    /// The bridge handed out.
    pub bridge: Arc<MockBridge>,
}

impl MockBridgeManager {
    /// Manager around a fresh mock bridge.
    pub fn new(ledger_type: LedgerType) -> Self {
        Self {
            bridge: Arc::new(MockBridge::new(ledger_type)),
        }
    }
}

impl BridgeManager for MockBridgeManager {
    fn bridge(&self, _network: &NetworkId) -> Option<Arc<dyn BridgeClient>> {
        Some(self.bridge.clone())
    }

    fn networks(&self) -> Vec<NetworkId> {
        Vec::new()
    }
}

/// Mock audit log keeping entries in memory.
#[derive(Default)]
pub struct MockAuditLog {
    /// Checkpoints in append order.
    pub entries: parking_lot::Mutex<Vec<LogEntry>>,
    /// Proofs in append order.
    pub proofs: parking_lot::Mutex<Vec<ProofEntry>>,
    /// When set, every write returns an `AuditError` and stores nothing.
    pub should_fail: bool,
}

#[async_trait]
impl AuditLog for MockAuditLog {
    async fn persist_log_entry(&self, entry: LogEntry) -> Result<(), AuditError> {
        if self.should_fail {
            return Err(AuditError("Mock failure".to_string()));
        }
        self.entries.lock().push(entry);
        Ok(())
    }

    async fn store_proof(&self, proof: ProofEntry) -> Result<(), AuditError> {
        if self.should_fail {
            return Err(AuditError("Mock failure".to_string()));
        }
        self.proofs.lock().push(proof);
        Ok(())
    }

    async fn latest_entry(&self, session_id: &str) -> Result<Option<LogEntry>, AuditError> {
        Ok(self
            .entries
            .lock()
            .iter()
            .rev()
            .find(|e| e.session_id == session_id)
            .cloned())
    }
}
