//! # Stage Services
//!
//! One generic `StageService<S, R>` carries the protocol logic of every
//! stage for either role. The stage and role are zero-sized markers, so
//! each `(stage, role)` pair exposes exactly the build and check operations
//! it owns:
//!
//! ```text
//!              ClientSide                        ServerSide
//! Stage0   new_session_request              check_new_session_request
//!          check_new_session_response       new_session_response
//!          pre_satp_transfer_request        check_pre_satp_transfer_request
//!          check_pre_satp_transfer_response pre_satp_transfer_response
//! Stage1   transfer_proposal_request        ...
//! ```
//!
//! Builders sign and record what they emit; checkers verify and record
//! what they accept.

pub(crate) mod common;
pub mod stage0;
pub mod stage1;
pub mod stage2;
pub mod stage3;

pub use stage1::ProposalOutcome;

use std::marker::PhantomData;
use std::sync::Arc;

use crate::adapters::{SameTransferPolicy, StandardProposalPolicy};
use crate::domain::{GatewayConfig, Role, SatpStage};
use crate::ports::outbound::{
    AuditLog, BridgeManager, CounterClaimPolicy, GatewayDirectory, ProposalPolicy,
};

// =============================================================================
// MARKERS (Zero-Sized Types)
// =============================================================================

/// Marker: Stage 0, session establishment.
#[derive(Debug, Clone, Copy)]
pub struct Stage0;

/// Marker: Stage 1, transfer agreement.
#[derive(Debug, Clone, Copy)]
pub struct Stage1;

/// Marker: Stage 2, lock evidence.
#[derive(Debug, Clone, Copy)]
pub struct Stage2;

/// Marker: Stage 3, commitment.
#[derive(Debug, Clone, Copy)]
pub struct Stage3;

/// Marker: the gateway initiating the transfer.
#[derive(Debug, Clone, Copy)]
pub struct ClientSide;

/// Marker: the gateway answering the transfer.
#[derive(Debug, Clone, Copy)]
pub struct ServerSide;

/// Stage marker.
pub trait StageMarker: Send + Sync + 'static {
    /// Stage the marker stands for.
    const STAGE: SatpStage;
}

/// Role marker.
pub trait RoleMarker: Send + Sync + 'static {
    /// Role the marker stands for.
    const ROLE: Role;
}

impl StageMarker for Stage0 {
    const STAGE: SatpStage = SatpStage::Stage0;
}

impl StageMarker for Stage1 {
    const STAGE: SatpStage = SatpStage::Stage1;
}

impl StageMarker for Stage2 {
    const STAGE: SatpStage = SatpStage::Stage2;
}

impl StageMarker for Stage3 {
    const STAGE: SatpStage = SatpStage::Stage3;
}

impl RoleMarker for ClientSide {
    const ROLE: Role = Role::Client;
}

impl RoleMarker for ServerSide {
    const ROLE: Role = Role::Server;
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Collaborators shared by every stage service of a gateway.
pub struct ServiceContext {
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
    /// Bridge lookup by network.
    pub bridges: Arc<dyn BridgeManager>,
    /// Audit log.
    pub audit: Arc<dyn AuditLog>,
    /// Known counterparts.
    pub directory: Arc<dyn GatewayDirectory>,
    /// Server-side proposal judgement.
    pub proposal_policy: Arc<dyn ProposalPolicy>,
    /// Client-side counter-claim judgement.
    pub counter_claim_policy: Arc<dyn CounterClaimPolicy>,
}

impl ServiceContext {
    /// Context with the default policies.
    pub fn new(
        config: GatewayConfig,
        bridges: Arc<dyn BridgeManager>,
        audit: Arc<dyn AuditLog>,
        directory: Arc<dyn GatewayDirectory>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            bridges,
            audit,
            directory,
            proposal_policy: Arc::new(StandardProposalPolicy::new()),
            counter_claim_policy: Arc::new(SameTransferPolicy),
        }
    }

    /// Replace the proposal policy.
    pub fn with_proposal_policy(mut self, policy: Arc<dyn ProposalPolicy>) -> Self {
        self.proposal_policy = policy;
        self
    }

    /// Replace the counter-claim policy.
    pub fn with_counter_claim_policy(mut self, policy: Arc<dyn CounterClaimPolicy>) -> Self {
        self.counter_claim_policy = policy;
        self
    }
}

// =============================================================================
// STAGE SERVICE
// =============================================================================

/// Protocol logic of stage `S` for role `R`.
pub struct StageService<S, R> {
    ctx: Arc<ServiceContext>,
    _marker: PhantomData<fn() -> (S, R)>,
}

impl<S: StageMarker, R: RoleMarker> StageService<S, R> {
    /// Service over a shared context.
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            _marker: PhantomData,
        }
    }

    /// Stage served.
    pub fn stage(&self) -> SatpStage {
        S::STAGE
    }

    /// Role served.
    pub fn role(&self) -> Role {
        R::ROLE
    }

    /// Shared context.
    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }
}

impl<S, R> Clone for StageService<S, R> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            _marker: PhantomData,
        }
    }
}

/// Stage 0 client service.
pub type Stage0ClientService = StageService<Stage0, ClientSide>;
/// Stage 0 server service.
pub type Stage0ServerService = StageService<Stage0, ServerSide>;
/// Stage 1 client service.
pub type Stage1ClientService = StageService<Stage1, ClientSide>;
/// Stage 1 server service.
pub type Stage1ServerService = StageService<Stage1, ServerSide>;
/// Stage 2 client service.
pub type Stage2ClientService = StageService<Stage2, ClientSide>;
/// Stage 2 server service.
pub type Stage2ServerService = StageService<Stage2, ServerSide>;
/// Stage 3 client service.
pub type Stage3ClientService = StageService<Stage3, ClientSide>;
/// Stage 3 server service.
pub type Stage3ServerService = StageService<Stage3, ServerSide>;

#[cfg(test)]
pub(crate) mod test_support {
    //! Two paired session projections, as a client and a server gateway
    //! would hold them after session creation.

    use super::*;
    use crate::domain::{
        Asset, LedgerType, NetworkId, Session, SessionData, TokenType,
    };
    use crate::ports::outbound::{MockAuditLog, MockBridgeManager};
    use shared_crypto::GatewayKeyPair;

    pub struct Pair {
        pub client_ctx: Arc<ServiceContext>,
        pub server_ctx: Arc<ServiceContext>,
        pub client: SessionData,
        pub server: SessionData,
        pub client_bridge: Arc<MockBridgeManager>,
        pub server_bridge: Arc<MockBridgeManager>,
        pub client_audit: Arc<MockAuditLog>,
    }

    pub fn fabric() -> NetworkId {
        NetworkId::new("fabric", LedgerType::Fabric2)
    }

    pub fn besu() -> NetworkId {
        NetworkId::new("besu", LedgerType::Besu2x)
    }

    fn context(
        id: &str,
        seed: u8,
        bridge: Arc<MockBridgeManager>,
        audit: Arc<MockAuditLog>,
    ) -> Arc<ServiceContext> {
        let config = GatewayConfig::new(id, GatewayKeyPair::from_bytes([seed; 32]).unwrap())
            .with_network(fabric())
            .with_network(besu());
        let directory = Arc::new(crate::adapters::StaticDirectory::new());
        Arc::new(ServiceContext::new(config, bridge, audit, directory))
    }

    pub fn pair() -> Pair {
        let client_bridge = Arc::new(MockBridgeManager::new(LedgerType::Fabric2));
        let server_bridge = Arc::new(MockBridgeManager::new(LedgerType::Besu2x));
        let client_audit = Arc::new(MockAuditLog::default());
        let client_ctx = context("gateway-a", 7, client_bridge.clone(), client_audit.clone());
        let server_ctx = context(
            "gateway-b",
            9,
            server_bridge.clone(),
            Arc::new(MockAuditLog::default()),
        );

        let session = Session::new_client("ctx-1", "v02").unwrap();
        let mut client = session.client_data().unwrap().clone();
        client.resource_url = "satp://gateway-a".into();
        client.client_gateway_id = "gateway-a".into();
        client.server_gateway_id = "gateway-b".into();
        client.client_gateway_pubkey = client_ctx.config.public_key_hex();
        client.server_gateway_pubkey = server_ctx.config.public_key_hex();
        client.sender_network = Some(fabric());
        client.receiver_network = Some(besu());
        client.sender_asset = Some(Asset::new(
            "token-1",
            TokenType::NonstandardFungible,
            10,
            "alice",
            "satp",
            fabric(),
        )
        .with_ontology("{}"));
        client.receiver_asset = Some(Asset::new(
            "0xtoken",
            TokenType::Erc20,
            10,
            "bob",
            "SATPContract",
            besu(),
        )
        .with_ontology("{}"));
        client.digital_asset_id = Some("token-1".into());
        client.asset_profile_id = Some("profile-1".into());
        client.originator = Some("alice".into());
        client.beneficiary = Some("bob".into());
        client.originator_pubkey = Some("02aa".into());
        client.beneficiary_pubkey = Some("02bb".into());
        client.sender_gateway_owner_id = Some("org-a".into());
        client.receiver_gateway_owner_id = Some("org-b".into());

        let mut server = SessionData::new(&client.id, "ctx-1", "v02");
        server.client_gateway_pubkey = client.client_gateway_pubkey.clone();
        server.server_gateway_pubkey = client.server_gateway_pubkey.clone();

        Pair {
            client_ctx,
            server_ctx,
            client,
            server,
            client_bridge,
            server_bridge,
            client_audit,
        }
    }
}
