//! Building blocks shared by every stage service.

use std::sync::Arc;
use tracing::{debug, warn};

use satp_telemetry::session_event;

use super::{RoleMarker, StageMarker, StageService};
use crate::domain::{
    now_millis, AssertionClaim, Asset, AssetSide, ClaimKind, Direction, MessageType, NetworkId,
    SatpError, SessionData,
};
use crate::integrity::{record_message, sign_message, sign_receipt, MessageVerifier};
use crate::messages::{CommonHeader, ProtocolMessage};
use crate::ports::outbound::{AuditLog, BridgeClient, LogEntry, LogOperation, ProofEntry};

/// Ledger operation behind an assertion claim.
#[derive(Clone, Debug)]
pub(crate) enum BridgeCall {
    Wrap(Asset),
    Lock { asset_id: String, amount: u64 },
    Mint { asset_id: String, amount: u64 },
    Burn { asset_id: String, amount: u64 },
    Assign {
        asset_id: String,
        recipient: String,
        amount: u64,
    },
}

impl BridgeCall {
    fn operation(&self) -> &'static str {
        match self {
            BridgeCall::Wrap(_) => "wrap",
            BridgeCall::Lock { .. } => "lock",
            BridgeCall::Mint { .. } => "mint",
            BridgeCall::Burn { .. } => "burn",
            BridgeCall::Assign { .. } => "assign",
        }
    }

    fn asset_id(&self) -> &str {
        match self {
            BridgeCall::Wrap(asset) => &asset.token_id,
            BridgeCall::Lock { asset_id, .. }
            | BridgeCall::Mint { asset_id, .. }
            | BridgeCall::Burn { asset_id, .. }
            | BridgeCall::Assign { asset_id, .. } => asset_id,
        }
    }

    async fn invoke(&self, bridge: &dyn BridgeClient) -> Result<String, SatpError> {
        let receipt = match self {
            BridgeCall::Wrap(asset) => bridge.wrap_asset(asset).await?,
            BridgeCall::Lock { asset_id, amount } => bridge.lock_asset(asset_id, *amount).await?,
            BridgeCall::Mint { asset_id, amount } => bridge.mint_asset(asset_id, *amount).await?,
            BridgeCall::Burn { asset_id, amount } => bridge.burn_asset(asset_id, *amount).await?,
            BridgeCall::Assign {
                asset_id,
                recipient,
                amount,
            } => bridge.assign_asset(asset_id, recipient, *amount).await?,
        };
        Ok(receipt)
    }
}

/// Append a checkpoint to the audit log. Failures are logged, never raised.
pub(crate) async fn checkpoint(
    audit: &dyn AuditLog,
    data: &SessionData,
    message_type: MessageType,
    operation: LogOperation,
    payload: String,
) {
    let entry = LogEntry {
        session_id: data.id.clone(),
        message_type,
        operation,
        data: payload,
        sequence_number: data.last_sequence_number,
        timestamp: now_millis(),
    };
    if let Err(e) = audit.persist_log_entry(entry).await {
        warn!(session_id = %data.id, "[satp] Audit log write failed: {}", e);
    }
}

impl<S: StageMarker, R: RoleMarker> StageService<S, R> {
    /// Header for a message of `message_type` with the given sequence number.
    pub(crate) fn header(
        &self,
        data: &SessionData,
        message_type: MessageType,
        sequence_number: u64,
    ) -> Result<CommonHeader, SatpError> {
        Ok(CommonHeader {
            version: data.version.clone(),
            message_type,
            session_id: data.id.clone(),
            transfer_context_id: data.transfer_context_id.clone(),
            sequence_number,
            resource_url: data.resource_url.clone(),
            client_gateway_pubkey: data.client_gateway_pubkey.clone(),
            server_gateway_pubkey: data.server_gateway_pubkey.clone(),
            hash_previous_message: data.previous_hash(message_type)?,
            client_transfer_number: data.client_transfer_number.clone(),
            server_transfer_number: data.server_transfer_number.clone(),
            client_signature: String::new(),
            server_signature: String::new(),
        })
    }

    /// Header of a client request answering `prior`.
    ///
    /// The sequence number follows the prior response, so a request rebuilt
    /// after a crash carries the same number as the original.
    pub(crate) fn request_header(
        &self,
        data: &SessionData,
        message_type: MessageType,
        prior: Option<&CommonHeader>,
    ) -> Result<CommonHeader, SatpError> {
        let sequence_number = prior.map_or(1, |h| h.sequence_number + 1);
        self.header(data, message_type, sequence_number)
    }

    /// Header of a server response to the last accepted request.
    pub(crate) fn response_header(
        &self,
        data: &SessionData,
        message_type: MessageType,
    ) -> Result<CommonHeader, SatpError> {
        self.header(data, message_type, data.last_sequence_number + 1)
    }

    /// Record the start of work on `message_type`.
    pub(crate) async fn begin(&self, data: &SessionData, message_type: MessageType) {
        checkpoint(
            self.ctx.audit.as_ref(),
            data,
            message_type,
            LogOperation::Init,
            String::new(),
        )
        .await;
    }

    /// Sign `message`, record it as sent, and hand it back.
    pub(crate) async fn seal<M: ProtocolMessage>(
        &self,
        data: &mut SessionData,
        mut message: M,
    ) -> Result<M, SatpError> {
        sign_message(&mut message, &self.ctx.config.key_pair, R::ROLE)?;
        let hash = record_message(data, &message, Direction::Sent, R::ROLE)?;
        let message_type = message.message_type();
        checkpoint(
            self.ctx.audit.as_ref(),
            data,
            message_type,
            LogOperation::Done,
            hash,
        )
        .await;
        session_event!(
            debug,
            data.id,
            message_type,
            "[satp] Message sealed",
            stage = %S::STAGE,
            sequence_number = data.last_sequence_number
        );
        Ok(message)
    }

    /// Verify a message from the counterpart and record it as received.
    pub(crate) async fn check<M: ProtocolMessage>(
        &self,
        data: &mut SessionData,
        message: &M,
        accepted: &[MessageType],
    ) -> Result<(), SatpError> {
        let session_id = data.id.clone();
        self.check_under(data, message, accepted, &session_id).await
    }

    /// `check` for a message that must name `session_id`.
    pub(crate) async fn check_under<M: ProtocolMessage>(
        &self,
        data: &mut SessionData,
        message: &M,
        accepted: &[MessageType],
        session_id: &str,
    ) -> Result<(), SatpError> {
        let message_type = message.message_type();
        self.begin(data, message_type).await;
        data.verify_open()?;

        let sender = R::ROLE.counterpart();
        MessageVerifier::new(data)
            .expecting_session(session_id)
            .verify(message, accepted, sender)?;
        let hash = record_message(data, message, Direction::Received, sender)?;

        checkpoint(
            self.ctx.audit.as_ref(),
            data,
            message_type,
            LogOperation::Done,
            hash,
        )
        .await;
        session_event!(
            debug,
            data.id,
            message_type,
            "[satp] Message verified",
            stage = %S::STAGE,
            sequence_number = data.last_sequence_number
        );
        Ok(())
    }

    /// Bridge serving `network`.
    pub(crate) fn bridge(&self, network: &NetworkId) -> Result<Arc<dyn BridgeClient>, SatpError> {
        self.ctx
            .bridges
            .bridge(network)
            .ok_or_else(|| SatpError::BridgeNotFound(network.to_string()))
    }

    /// Claim of `kind`, taken from the session if already recorded,
    /// otherwise produced by running `call` on the bridge of `network`.
    pub(crate) async fn assert_claim(
        &self,
        data: &mut SessionData,
        kind: ClaimKind,
        message_type: MessageType,
        network: &NetworkId,
        call: BridgeCall,
    ) -> Result<AssertionClaim, SatpError> {
        if let Some(existing) = data.claims.get(kind) {
            debug!(session_id = %data.id, "[satp] Reusing recorded {}", kind);
            return Ok(existing.clone());
        }

        let bridge = self.bridge(network)?;
        checkpoint(
            self.ctx.audit.as_ref(),
            data,
            message_type,
            LogOperation::Exec,
            call.operation().to_string(),
        )
        .await;

        let receipt = call.invoke(bridge.as_ref()).await?;
        let proof = bridge.get_proof(call.asset_id()).await?;
        let claim = AssertionClaim {
            signature: sign_receipt(&self.ctx.config.key_pair, &receipt),
            receipt,
            proof,
        };

        let stored = self
            .ctx
            .audit
            .store_proof(ProofEntry {
                session_id: data.id.clone(),
                message_type,
                operation: call.operation().to_string(),
                data: claim.proof.clone(),
            })
            .await;
        if let Err(e) = stored {
            warn!(session_id = %data.id, "[satp] Proof not stored: {}", e);
        }

        data.claims.set(kind, claim.clone());
        Ok(claim)
    }

    /// Receipt format of the bridge serving `network`.
    pub(crate) fn receipt_format(&self, network: &NetworkId) -> Result<String, SatpError> {
        Ok(self.bridge(network)?.receipt_format())
    }
}

/// Asset on `side`, with a token id.
pub(crate) fn asset(data: &SessionData, side: AssetSide) -> Result<&Asset, SatpError> {
    let asset = match side {
        AssetSide::Sender => data.sender_asset.as_ref(),
        AssetSide::Receiver => data.receiver_asset.as_ref(),
    }
    .ok_or(SatpError::LedgerAsset { side })?;
    if asset.token_id.is_empty() {
        return Err(SatpError::LedgerAssetId { side });
    }
    Ok(asset)
}

/// Claim that must already be recorded.
pub(crate) fn recorded_claim(
    data: &SessionData,
    kind: ClaimKind,
) -> Result<AssertionClaim, SatpError> {
    data.claims
        .get(kind)
        .cloned()
        .ok_or(SatpError::MissingClaim { claim: kind })
}

/// Claim carried by a message; an empty receipt counts as absent.
pub(crate) fn carried_claim(
    claim: &AssertionClaim,
    kind: ClaimKind,
) -> Result<AssertionClaim, SatpError> {
    if claim.receipt.is_empty() {
        return Err(SatpError::MissingClaim { claim: kind });
    }
    Ok(claim.clone())
}

/// Session field that must be set.
pub(crate) fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, SatpError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SatpError::SessionData(format!("{name} not set")))
}

/// Typed copy of a message stored in the session ledger.
pub(crate) fn stored<M: ProtocolMessage>(
    data: &SessionData,
    message_type: MessageType,
) -> Result<M, SatpError> {
    data.ledger
        .message(message_type)
        .cloned()
        .ok_or_else(|| SatpError::SessionData(format!("no stored {message_type}")))?
        .into_typed()
}
