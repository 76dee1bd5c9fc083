//! # Stage 1: Transfer Agreement
//!
//! The client proposes transfer claims together with its network
//! capabilities. The server answers `INIT_RECEIPT` (accepted) or
//! `INIT_REJECT`, optionally carrying counter-claims. Counter-claims the
//! client accepts keep the session alive in `CONDITIONAL_REJECTED`; every
//! other rejection ends it in `REJECTED`.
//!
//! The hash of the agreed claims is stored at proposal time and must be
//! echoed by the commence request.

use tracing::{info, warn};

use super::common::stored;
use super::{ClientSide, ServerSide, Stage1, StageService};
use crate::domain::{
    AssetSide, MessageType, SatpError, SessionData, SessionState, SignatureAlgorithm,
    TransferClaims,
};
use crate::integrity::hash_claims;
use crate::messages::{
    PreSatpTransferResponse, TransferCommenceRequest, TransferCommenceResponse,
    TransferProposalReceipt, TransferProposalRequest,
};
use crate::ports::outbound::ProposalDecision;

/// How the client ended up after the proposal round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// `INIT_RECEIPT`: the proposal stands.
    Accepted,
    /// `INIT_REJECT` with counter-claims the client accepted.
    CounterAccepted,
    /// `INIT_REJECT` ending the transfer.
    Rejected(String),
}

impl StageService<Stage1, ClientSide> {
    /// Build the transfer proposal from the session's transfer parameters.
    pub async fn transfer_proposal_request(
        &self,
        data: &mut SessionData,
        prior: &PreSatpTransferResponse,
    ) -> Result<TransferProposalRequest, SatpError> {
        let message_type = MessageType::InitProposal;
        self.begin(data, message_type).await;

        let config = &self.ctx.config;
        let sender_network = data.sender_network.clone().ok_or(SatpError::LedgerAsset {
            side: AssetSide::Sender,
        })?;
        if !config.supports_network(&sender_network) {
            return Err(SatpError::NetworkNotSupported(sender_network.to_string()));
        }

        let claims = transfer_claims(data)?;
        let capabilities = data
            .capabilities
            .clone()
            .unwrap_or_else(|| config.capabilities(&sender_network));

        data.capabilities = Some(capabilities.clone());
        data.hash_transfer_init_claims = Some(hash_claims(&claims)?);
        data.multiple_claims_allowed = config.multiple_claims_allowed;
        data.multiple_cancels_allowed = config.multiple_cancels_allowed;

        let request = TransferProposalRequest {
            common: self.request_header(data, message_type, Some(&prior.common))?,
            transfer_init_claims: claims,
            network_capabilities: capabilities,
            multiple_claims_allowed: data.multiple_claims_allowed,
            multiple_cancels_allowed: data.multiple_cancels_allowed,
        };
        self.seal(data, request).await
    }

    /// Verify the proposal answer and settle the negotiation.
    pub async fn check_transfer_proposal_response(
        &self,
        response: &TransferProposalReceipt,
        data: &mut SessionData,
    ) -> Result<ProposalOutcome, SatpError> {
        self.check(
            data,
            response,
            &[MessageType::InitReceipt, MessageType::InitReject],
        )
        .await?;
        note_transfer_number(
            &data.id,
            &mut data.server_transfer_number,
            &response.common.server_transfer_number,
        );

        if response.common.message_type == MessageType::InitReceipt {
            if Some(&response.hash_transfer_init_claims) != data.hash_transfer_init_claims.as_ref() {
                return Err(SatpError::TransferInitClaimsHash);
            }
            return Ok(ProposalOutcome::Accepted);
        }

        let Some(counter) = &response.transfer_counter_claims else {
            let reason = response
                .reject_reason
                .clone()
                .unwrap_or_else(|| "proposal rejected".to_string());
            data.transition(SessionState::Rejected)?;
            info!("[satp] Session {} rejected: {}", data.id, reason);
            return Ok(ProposalOutcome::Rejected(reason));
        };

        let proposal: TransferProposalRequest = stored(data, MessageType::InitProposal)?;
        if !self
            .ctx
            .counter_claim_policy
            .accept(&proposal.transfer_init_claims, counter)
        {
            data.transition(SessionState::Rejected)?;
            info!("[satp] Session {} rejected: counter-claims refused", data.id);
            return Ok(ProposalOutcome::Rejected("counter-claims refused".to_string()));
        }

        let hash = hash_claims(counter)?;
        adopt_claims(data, counter);
        data.proposed_transfer_init_claims = Some(hash.clone());
        data.hash_transfer_init_claims = Some(hash);
        data.transition(SessionState::ConditionalRejected)?;
        info!("[satp] Session {} continues under counter-claims", data.id);
        Ok(ProposalOutcome::CounterAccepted)
    }

    /// Build the commence request echoing the agreed claims hash.
    pub async fn transfer_commence_request(
        &self,
        data: &mut SessionData,
        prior: &TransferProposalReceipt,
    ) -> Result<TransferCommenceRequest, SatpError> {
        let message_type = MessageType::TransferCommenceRequest;
        self.begin(data, message_type).await;

        let hash_transfer_init_claims = data
            .hash_transfer_init_claims
            .clone()
            .ok_or_else(|| SatpError::TransferInitClaims("no agreed claims hash".to_string()))?;
        let request = TransferCommenceRequest {
            common: self.request_header(data, message_type, Some(&prior.common))?,
            hash_transfer_init_claims,
        };
        self.seal(data, request).await
    }

    /// Verify the commence response.
    pub async fn check_transfer_commence_response(
        &self,
        response: &TransferCommenceResponse,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, response, &[MessageType::TransferCommenceResponse])
            .await
    }
}

impl StageService<Stage1, ServerSide> {
    /// Verify a proposal: integrity, capabilities, network support, and
    /// consistency with the session opened in Stage 0.
    pub async fn check_transfer_proposal_request(
        &self,
        request: &TransferProposalRequest,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, request, &[MessageType::InitProposal])
            .await?;

        let claims = &request.transfer_init_claims;
        let capabilities = &request.network_capabilities;
        if capabilities.signature_algorithm != SignatureAlgorithm::Ecdsa {
            return Err(SatpError::NetworkCapabilities(format!(
                "unsupported signature algorithm {:?}",
                capabilities.signature_algorithm
            )));
        }
        if capabilities.lock_expiration_time == 0 {
            return Err(SatpError::NetworkCapabilities(
                "lock expiration time must be positive".to_string(),
            ));
        }
        if capabilities.sender_gateway_network_id != claims.sender_gateway_network_id {
            return Err(SatpError::NetworkCapabilities(
                "capabilities advertised for another network".to_string(),
            ));
        }
        if !self
            .ctx
            .config
            .supports_network(&claims.recipient_gateway_network_id)
        {
            return Err(SatpError::NetworkNotSupported(
                claims.recipient_gateway_network_id.to_string(),
            ));
        }
        if Some(&claims.recipient_gateway_network_id) != data.receiver_network.as_ref() {
            return Err(SatpError::TransferInitClaims(
                "recipient network differs from session".to_string(),
            ));
        }
        if claims.client_identity_pubkey != data.client_gateway_pubkey {
            return Err(SatpError::ClientPubkey);
        }
        if claims.server_identity_pubkey != data.server_gateway_pubkey {
            return Err(SatpError::ServerPubkey);
        }

        adopt_claims(data, claims);
        data.capabilities = Some(capabilities.clone());
        data.multiple_claims_allowed = request.multiple_claims_allowed;
        data.multiple_cancels_allowed = request.multiple_cancels_allowed;
        data.hash_transfer_init_claims = Some(hash_claims(claims)?);
        note_transfer_number(
            &data.id,
            &mut data.client_transfer_number,
            &request.common.client_transfer_number,
        );
        Ok(())
    }

    /// Judge the stored proposal and answer `INIT_RECEIPT` or `INIT_REJECT`.
    pub async fn transfer_proposal_response(
        &self,
        data: &mut SessionData,
    ) -> Result<TransferProposalReceipt, SatpError> {
        let proposal: TransferProposalRequest = stored(data, MessageType::InitProposal)?;
        let hash_transfer_init_claims = data
            .hash_transfer_init_claims
            .clone()
            .ok_or_else(|| SatpError::TransferInitClaims("proposal not accepted".to_string()))?;

        let decision = self
            .ctx
            .proposal_policy
            .evaluate(&proposal.transfer_init_claims, &proposal.network_capabilities);
        let (message_type, counter, reason) = match decision {
            ProposalDecision::Accept => (MessageType::InitReceipt, None, None),
            ProposalDecision::Reject(reason) => (MessageType::InitReject, None, Some(reason)),
            ProposalDecision::Counter(claims) => (MessageType::InitReject, Some(claims), None),
        };

        let response = TransferProposalReceipt {
            common: self.response_header(data, message_type)?,
            hash_transfer_init_claims,
            transfer_counter_claims: counter.clone(),
            reject_reason: reason.clone(),
        };
        let response = self.seal(data, response).await?;

        match (counter, reason) {
            (Some(counter), _) => {
                adopt_claims(data, &counter);
                let hash = hash_claims(&counter)?;
                data.proposed_transfer_init_claims = Some(hash.clone());
                data.hash_transfer_init_claims = Some(hash);
                data.transition(SessionState::ConditionalRejected)?;
                info!("[satp] Session {} countered", data.id);
            }
            (None, Some(reason)) => {
                data.transition(SessionState::Rejected)?;
                info!("[satp] Session {} rejected: {}", data.id, reason);
            }
            (None, None) => {}
        }
        Ok(response)
    }

    /// Verify the commence request against the agreed claims hash.
    pub async fn check_transfer_commence_request(
        &self,
        request: &TransferCommenceRequest,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, request, &[MessageType::TransferCommenceRequest])
            .await?;
        if Some(&request.hash_transfer_init_claims) != data.hash_transfer_init_claims.as_ref() {
            return Err(SatpError::TransferInitClaimsHash);
        }
        Ok(())
    }

    /// Build the commence response.
    pub async fn transfer_commence_response(
        &self,
        data: &mut SessionData,
    ) -> Result<TransferCommenceResponse, SatpError> {
        let response = TransferCommenceResponse {
            common: self.response_header(data, MessageType::TransferCommenceResponse)?,
        };
        self.seal(data, response).await
    }
}

/// Assemble the client's transfer claims from session fields.
fn transfer_claims(data: &SessionData) -> Result<TransferClaims, SatpError> {
    fn field(value: &Option<String>, name: &str) -> Result<String, SatpError> {
        value
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SatpError::TransferInitClaims(format!("{name} not set")))
    }

    Ok(TransferClaims {
        digital_asset_id: field(&data.digital_asset_id, "digitalAssetId")?,
        asset_profile_id: field(&data.asset_profile_id, "assetProfileId")?,
        verified_originator_entity_id: field(&data.originator, "originator")?,
        verified_beneficiary_entity_id: field(&data.beneficiary, "beneficiary")?,
        originator_pubkey: field(&data.originator_pubkey, "originatorPubkey")?,
        beneficiary_pubkey: field(&data.beneficiary_pubkey, "beneficiaryPubkey")?,
        sender_gateway_network_id: data.sender_network.clone().ok_or_else(|| {
            SatpError::TransferInitClaims("sender network not set".to_string())
        })?,
        recipient_gateway_network_id: data.receiver_network.clone().ok_or_else(|| {
            SatpError::TransferInitClaims("recipient network not set".to_string())
        })?,
        client_identity_pubkey: data.client_gateway_pubkey.clone(),
        server_identity_pubkey: data.server_gateway_pubkey.clone(),
        sender_gateway_owner_id: field(&data.sender_gateway_owner_id, "senderGatewayOwnerId")?,
        receiver_gateway_owner_id: field(
            &data.receiver_gateway_owner_id,
            "receiverGatewayOwnerId",
        )?,
    })
}

/// Copy agreed claims into the session.
fn adopt_claims(data: &mut SessionData, claims: &TransferClaims) {
    data.digital_asset_id = Some(claims.digital_asset_id.clone());
    data.asset_profile_id = Some(claims.asset_profile_id.clone());
    data.originator = Some(claims.verified_originator_entity_id.clone());
    data.beneficiary = Some(claims.verified_beneficiary_entity_id.clone());
    data.originator_pubkey = Some(claims.originator_pubkey.clone());
    data.beneficiary_pubkey = Some(claims.beneficiary_pubkey.clone());
    data.sender_gateway_owner_id = Some(claims.sender_gateway_owner_id.clone());
    data.receiver_gateway_owner_id = Some(claims.receiver_gateway_owner_id.clone());
}

/// Adopt a counterpart's transfer number; a different one is only logged.
fn note_transfer_number(session_id: &str, current: &mut Option<String>, carried: &Option<String>) {
    match (current.as_ref(), carried) {
        (Some(known), Some(other)) if known != other => {
            warn!(
                "[satp] Session {}: transfer number {} differs from {}",
                session_id, other, known
            );
        }
        (None, Some(other)) => *current = Some(other.clone()),
        _ => {}
    }
}
