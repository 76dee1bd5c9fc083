//! # Two-Gateway Harness
//!
//! Gateway A (client) holds the asset on `fabric`; gateway B (server)
//! receives it on `besu`. A's only route to B goes through a
//! [`FaultyTransport`], which can drop one request or one response, or
//! rename the session in B's answer. A's audit log is a
//! [`CrashingAuditLog`], which can stop A for good at a checkpoint.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Notify;

use satp_gateway::messages::*;
use satp_gateway::ports::outbound::{
    AuditError, CounterClaimPolicy, LogEntry, LogOperation, ProofEntry, ProposalPolicy,
};
use satp_gateway::{
    Asset, AuditLog, BridgeRegistry, GatewayConfig, GatewayTransport, InMemoryAuditLog,
    InMemoryLedgerBridge, LedgerType, MessageType, NetworkId, SatpManager, ServiceContext,
    SessionData, SessionStore, StaticDirectory, TokenType, TransferRequest, TransportError,
};
use shared_crypto::GatewayKeyPair;

pub const CLIENT_ID: &str = "gateway-a";
pub const SERVER_ID: &str = "gateway-b";
pub const SENDER_TOKEN: &str = "token-1";
pub const RECEIVER_TOKEN: &str = "0xtoken";
pub const AMOUNT: u64 = 10;

pub fn fabric() -> NetworkId {
    NetworkId::new("fabric", LedgerType::Fabric2)
}

pub fn besu() -> NetworkId {
    NetworkId::new("besu", LedgerType::Besu2x)
}

// =============================================================================
// FAULTY LINK
// =============================================================================

/// One-shot fault on a request type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// The request never reaches the server.
    DropRequest,
    /// The server processes the request; its answer is lost.
    DropResponse,
}

/// Transport that forwards to a server handler, minus injected faults.
pub struct FaultyTransport {
    inner: Arc<dyn GatewayTransport>,
    faults: Mutex<HashMap<MessageType, Fault>>,
    forged_session_id: Mutex<Option<String>>,
    delivered: Mutex<Vec<MessageType>>,
}

impl FaultyTransport {
    pub fn new(inner: Arc<dyn GatewayTransport>) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
            forged_session_id: Mutex::new(None),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Apply `fault` to the next request of `message_type`.
    pub fn inject(&self, message_type: MessageType, fault: Fault) {
        self.faults.lock().insert(message_type, fault);
    }

    /// Overwrite the session id of the next `NEW_SESSION_RESPONSE`,
    /// leaving the server's signature as it was.
    pub fn forge_session_id(&self, session_id: &str) {
        *self.forged_session_id.lock() = Some(session_id.to_string());
    }

    /// Request types that reached the server, in order.
    pub fn delivered(&self) -> Vec<MessageType> {
        self.delivered.lock().clone()
    }

    async fn relay<R, F>(&self, message_type: MessageType, call: F) -> Result<R, TransportError>
    where
        F: Future<Output = Result<R, TransportError>> + Send,
    {
        let fault = self.faults.lock().remove(&message_type);
        if fault == Some(Fault::DropRequest) {
            return Err(TransportError::Unavailable(format!("{message_type} dropped")));
        }
        self.delivered.lock().push(message_type);
        // in flight for at least one scheduler turn
        tokio::task::yield_now().await;
        let response = call.await;
        match fault {
            Some(Fault::DropResponse) => Err(TransportError::Timeout),
            _ => response,
        }
    }
}

#[async_trait]
impl GatewayTransport for FaultyTransport {
    async fn new_session(
        &self,
        request: NewSessionRequest,
    ) -> Result<NewSessionResponse, TransportError> {
        let mut response = self
            .relay(MessageType::NewSessionRequest, self.inner.new_session(request))
            .await?;
        if let Some(session_id) = self.forged_session_id.lock().take() {
            response.common.session_id = session_id;
        }
        Ok(response)
    }

    async fn pre_satp_transfer(
        &self,
        request: PreSatpTransferRequest,
    ) -> Result<PreSatpTransferResponse, TransportError> {
        self.relay(
            MessageType::PreSatpTransferRequest,
            self.inner.pre_satp_transfer(request),
        )
        .await
    }

    async fn transfer_proposal(
        &self,
        request: TransferProposalRequest,
    ) -> Result<TransferProposalReceipt, TransportError> {
        self.relay(MessageType::InitProposal, self.inner.transfer_proposal(request))
            .await
    }

    async fn transfer_commence(
        &self,
        request: TransferCommenceRequest,
    ) -> Result<TransferCommenceResponse, TransportError> {
        self.relay(
            MessageType::TransferCommenceRequest,
            self.inner.transfer_commence(request),
        )
        .await
    }

    async fn lock_assertion(
        &self,
        request: LockAssertionRequest,
    ) -> Result<LockAssertionReceipt, TransportError> {
        self.relay(MessageType::LockAssert, self.inner.lock_assertion(request))
            .await
    }

    async fn commit_preparation(
        &self,
        request: CommitPreparationRequest,
    ) -> Result<CommitReadyResponse, TransportError> {
        self.relay(MessageType::CommitPrepare, self.inner.commit_preparation(request))
            .await
    }

    async fn commit_final_assertion(
        &self,
        request: CommitFinalAssertionRequest,
    ) -> Result<CommitFinalAcknowledgementReceipt, TransportError> {
        self.relay(MessageType::CommitFinal, self.inner.commit_final_assertion(request))
            .await
    }

    async fn transfer_complete(
        &self,
        request: TransferCompleteRequest,
    ) -> Result<TransferCompleteResponse, TransportError> {
        self.relay(
            MessageType::CommitTransferComplete,
            self.inner.transfer_complete(request),
        )
        .await
    }
}

// =============================================================================
// CRASHING AUDIT LOG
// =============================================================================

/// Audit log that never returns from one chosen checkpoint, the way a
/// gateway process dies mid-step. Entries reach the wrapped log first.
pub struct CrashingAuditLog {
    inner: Arc<InMemoryAuditLog>,
    crash_at: Mutex<Option<(MessageType, LogOperation)>>,
    crashed: Notify,
}

impl CrashingAuditLog {
    pub fn new(inner: Arc<InMemoryAuditLog>) -> Self {
        Self {
            inner,
            crash_at: Mutex::new(None),
            crashed: Notify::new(),
        }
    }

    /// Hang the writer of the next `operation` checkpoint on `message_type`.
    pub fn crash_at(&self, message_type: MessageType, operation: LogOperation) {
        *self.crash_at.lock() = Some((message_type, operation));
    }

    /// Wait until a writer is hung.
    pub async fn crashed(&self) {
        self.crashed.notified().await;
    }
}

#[async_trait]
impl AuditLog for CrashingAuditLog {
    async fn persist_log_entry(&self, entry: LogEntry) -> Result<(), AuditError> {
        let point = Some((entry.message_type, entry.operation));
        let hit = {
            let mut crash_at = self.crash_at.lock();
            let hit = *crash_at == point;
            if hit {
                *crash_at = None;
            }
            hit
        };
        self.inner.persist_log_entry(entry).await?;
        if hit {
            self.crashed.notify_one();
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn store_proof(&self, proof: ProofEntry) -> Result<(), AuditError> {
        self.inner.store_proof(proof).await
    }

    async fn latest_entry(&self, session_id: &str) -> Result<Option<LogEntry>, AuditError> {
        self.inner.latest_entry(session_id).await
    }
}

// =============================================================================
// GATEWAYS
// =============================================================================

/// One gateway and the in-memory systems around it.
pub struct Gateway {
    pub manager: Arc<SatpManager>,
    pub ctx: Arc<ServiceContext>,
    pub bridge: Arc<InMemoryLedgerBridge>,
    pub audit: Arc<InMemoryAuditLog>,
    pub directory: Arc<StaticDirectory>,
}

impl Gateway {
    /// Clone of a session projection, client side first.
    pub async fn session(&self, session_id: &str) -> SessionData {
        let handle = self
            .manager
            .sessions()
            .get(session_id)
            .unwrap_or_else(|| panic!("{session_id} not stored"));
        let session = handle.lock().await;
        session
            .client_data()
            .or_else(|_| session.server_data())
            .unwrap()
            .clone()
    }
}

/// Client gateway A linked to server gateway B.
pub struct Harness {
    pub client: Gateway,
    pub server: Gateway,
    pub link: Arc<FaultyTransport>,
    /// Gateway A's audit log, as its stage services see it.
    pub crash: Arc<CrashingAuditLog>,
}

/// Builder for [`Harness`].
#[derive(Default)]
pub struct HarnessBuilder {
    proposal_policy: Option<Arc<dyn ProposalPolicy>>,
    counter_claim_policy: Option<Arc<dyn CounterClaimPolicy>>,
    sender_balance: Option<u64>,
}

impl HarnessBuilder {
    /// Proposal policy of gateway B.
    pub fn proposal_policy(mut self, policy: Arc<dyn ProposalPolicy>) -> Self {
        self.proposal_policy = Some(policy);
        self
    }

    /// Counter-claim policy of gateway A.
    pub fn counter_claim_policy(mut self, policy: Arc<dyn CounterClaimPolicy>) -> Self {
        self.counter_claim_policy = Some(policy);
        self
    }

    /// Balance of the sender token on `fabric`.
    pub fn sender_balance(mut self, amount: u64) -> Self {
        self.sender_balance = Some(amount);
        self
    }

    pub fn build(self) -> Harness {
        satp_telemetry::init_test_tracing();

        let client_key = GatewayKeyPair::from_bytes([7; 32]).unwrap();
        let server_key = GatewayKeyPair::from_bytes([9; 32]).unwrap();
        let client_pubkey = client_key.public_key().to_hex();
        let server_pubkey = server_key.public_key().to_hex();

        // Gateway B
        let server_bridge = Arc::new(InMemoryLedgerBridge::new(besu()));
        let server_audit = Arc::new(InMemoryAuditLog::new());
        let server_directory = Arc::new(StaticDirectory::new());
        server_directory.register(CLIENT_ID, &client_pubkey);
        let mut server_ctx = ServiceContext::new(
            config(SERVER_ID, "org-b", server_key),
            Arc::new(BridgeRegistry::new().with_bridge(besu(), server_bridge.clone())),
            server_audit.clone(),
            server_directory.clone(),
        );
        if let Some(policy) = self.proposal_policy {
            server_ctx = server_ctx.with_proposal_policy(policy);
        }
        let server_ctx = Arc::new(server_ctx);
        let server = Gateway {
            manager: Arc::new(SatpManager::with_store(
                server_ctx.clone(),
                Arc::new(SessionStore::new()),
            )),
            ctx: server_ctx,
            bridge: server_bridge,
            audit: server_audit,
            directory: server_directory,
        };

        // Gateway A
        let client_bridge = Arc::new(
            InMemoryLedgerBridge::new(fabric()).with_balance(
                SENDER_TOKEN,
                "alice",
                self.sender_balance.unwrap_or(AMOUNT),
            ),
        );
        let client_audit = Arc::new(InMemoryAuditLog::new());
        let crash = Arc::new(CrashingAuditLog::new(client_audit.clone()));
        let client_directory = Arc::new(StaticDirectory::new());
        client_directory.register(SERVER_ID, &server_pubkey);
        let link = Arc::new(FaultyTransport::new(server.manager.server_handler()));
        client_directory.connect(SERVER_ID, link.clone());
        let mut client_ctx = ServiceContext::new(
            config(CLIENT_ID, "org-a", client_key),
            Arc::new(BridgeRegistry::new().with_bridge(fabric(), client_bridge.clone())),
            crash.clone(),
            client_directory.clone(),
        );
        if let Some(policy) = self.counter_claim_policy {
            client_ctx = client_ctx.with_counter_claim_policy(policy);
        }
        let client_ctx = Arc::new(client_ctx);
        let client = Gateway {
            manager: Arc::new(SatpManager::with_store(
                client_ctx.clone(),
                Arc::new(SessionStore::new()),
            )),
            ctx: client_ctx,
            bridge: client_bridge,
            audit: client_audit,
            directory: client_directory,
        };

        Harness {
            client,
            server,
            link,
            crash,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Open a client session for the standard transfer.
    pub fn start(&self) -> String {
        self.client.manager.create_session(request()).unwrap()
    }

    /// Open a client session for the standard transfer in another context.
    pub fn start_in(&self, transfer_context_id: &str) -> String {
        let mut request = request();
        request.transfer_context_id = transfer_context_id.to_string();
        self.client.manager.create_session(request).unwrap()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

fn config(gateway_id: &str, owner_id: &str, key_pair: GatewayKeyPair) -> GatewayConfig {
    GatewayConfig::new(gateway_id, key_pair)
        .with_resource_url(format!("satp://{gateway_id}"))
        .with_owner(owner_id)
        .with_network(fabric())
        .with_network(besu())
}

/// 10 units of `token-1` from alice on fabric to bob on besu.
pub fn request() -> TransferRequest {
    TransferRequest {
        transfer_context_id: "ctx-1".to_string(),
        server_gateway_id: SERVER_ID.to_string(),
        sender_asset: Asset::new(
            SENDER_TOKEN,
            TokenType::NonstandardFungible,
            AMOUNT,
            "alice",
            "satp",
            fabric(),
        )
        .with_ontology("{}"),
        receiver_asset: Asset::new(
            RECEIVER_TOKEN,
            TokenType::Erc20,
            AMOUNT,
            "bob",
            "SATPContract",
            besu(),
        )
        .with_ontology("{}"),
        asset_profile_id: "profile-1".to_string(),
        originator: "alice".to_string(),
        beneficiary: "bob".to_string(),
        originator_pubkey: "02aa".to_string(),
        beneficiary_pubkey: "02bb".to_string(),
        receiver_gateway_owner_id: "org-b".to_string(),
    }
}
