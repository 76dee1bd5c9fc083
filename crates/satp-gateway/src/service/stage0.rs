//! # Stage 0: Session Establishment
//!
//! ```text
//! client                                        server
//!   │── NEW_SESSION_REQUEST ───────────────────────▶│
//!   │◀──────────────────────── NEW_SESSION_RESPONSE ─│
//!   │   wrap(sender asset)                           │
//!   │── PRE_SATP_TRANSFER_REQUEST ─────────────────▶│
//!   │                           wrap(receiver asset) │
//!   │◀────────────────── PRE_SATP_TRANSFER_RESPONSE ─│
//! ```

use tracing::info;

use super::common::{asset, carried_claim, BridgeCall};
use super::{ClientSide, ServerSide, Stage0, StageService};
use crate::domain::{Asset, AssetSide, ClaimKind, MessageType, Role, SatpError, SessionData};
use crate::integrity::MessageVerifier;
use crate::messages::{
    NewSessionRequest, NewSessionResponse, PreSatpTransferRequest, PreSatpTransferResponse,
};

impl StageService<Stage0, ClientSide> {
    /// Build the session request. Always the first message of a session.
    pub async fn new_session_request(
        &self,
        data: &mut SessionData,
    ) -> Result<NewSessionRequest, SatpError> {
        let message_type = MessageType::NewSessionRequest;
        self.begin(data, message_type).await;

        let sender_gateway_network_id = data
            .sender_network
            .clone()
            .ok_or(SatpError::LedgerAsset {
                side: AssetSide::Sender,
            })?;
        let recipient_gateway_network_id = data
            .receiver_network
            .clone()
            .ok_or(SatpError::LedgerAsset {
                side: AssetSide::Receiver,
            })?;
        if data.server_gateway_id.is_empty() {
            return Err(SatpError::MissingParameter {
                field: "serverGatewayId",
            });
        }

        let request = NewSessionRequest {
            common: self.request_header(data, message_type, None)?,
            client_gateway_id: data.client_gateway_id.clone(),
            server_gateway_id: data.server_gateway_id.clone(),
            sender_gateway_network_id,
            recipient_gateway_network_id,
        };
        self.seal(data, request).await
    }

    /// Verify the session response.
    pub async fn check_new_session_response(
        &self,
        response: &NewSessionResponse,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, response, &[MessageType::NewSessionResponse])
            .await?;
        if response.server_gateway_id != data.server_gateway_id {
            return Err(SatpError::UnknownGateway(response.server_gateway_id.clone()));
        }
        Ok(())
    }

    /// Verify a session response that names a new session id, before the
    /// id is adopted. Nothing is recorded; `check_new_session_response`
    /// runs once the session carries the new id.
    pub fn verify_renumbering(
        &self,
        response: &NewSessionResponse,
        data: &SessionData,
    ) -> Result<(), SatpError> {
        data.verify_open()?;
        MessageVerifier::new(data)
            .expecting_session(&response.common.session_id)
            .verify(response, &[MessageType::NewSessionResponse], Role::Server)?;
        if response.server_gateway_id != data.server_gateway_id {
            return Err(SatpError::UnknownGateway(response.server_gateway_id.clone()));
        }
        Ok(())
    }

    /// Wrap the sender asset and build the pre-transfer request.
    pub async fn pre_satp_transfer_request(
        &self,
        data: &mut SessionData,
        prior: &NewSessionResponse,
    ) -> Result<PreSatpTransferRequest, SatpError> {
        let message_type = MessageType::PreSatpTransferRequest;
        self.begin(data, message_type).await;

        let sender_asset = asset(data, AssetSide::Sender)?.clone();
        let receiver_asset = asset(data, AssetSide::Receiver)?.clone();
        require_ontology(&sender_asset, AssetSide::Sender)?;
        let wrap_assertion_claim = self
            .assert_claim(
                data,
                ClaimKind::SenderWrap,
                message_type,
                &sender_asset.network_id,
                BridgeCall::Wrap(sender_asset.clone()),
            )
            .await?;

        let request = PreSatpTransferRequest {
            common: self.request_header(data, message_type, Some(&prior.common))?,
            sender_asset,
            receiver_asset,
            wrap_assertion_claim,
        };
        self.seal(data, request).await
    }

    /// Verify the pre-transfer response and adopt the receiver token id.
    pub async fn check_pre_satp_transfer_response(
        &self,
        response: &PreSatpTransferResponse,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, response, &[MessageType::PreSatpTransferResponse])
            .await?;
        let claim = carried_claim(&response.wrap_assertion_claim, ClaimKind::ReceiverWrap)?;
        data.claims.set(ClaimKind::ReceiverWrap, claim);
        if !response.recipient_token_id.is_empty() {
            if let Some(receiver) = data.receiver_asset.as_mut() {
                receiver.token_id = response.recipient_token_id.clone();
            }
        }
        Ok(())
    }
}

impl StageService<Stage0, ServerSide> {
    /// Verify a session request and adopt its identities and networks.
    ///
    /// The caller seeds `data` with the client key from its directory and
    /// its own key before calling.
    pub async fn check_new_session_request(
        &self,
        request: &NewSessionRequest,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        // the request names the id the client proposed; `data` may
        // already carry the one this server answers under
        self.check_under(
            data,
            request,
            &[MessageType::NewSessionRequest],
            &request.common.session_id,
        )
        .await?;

        let config = &self.ctx.config;
        if request.server_gateway_id != config.gateway_id {
            return Err(SatpError::UnknownGateway(request.server_gateway_id.clone()));
        }
        if !config.supports_network(&request.recipient_gateway_network_id) {
            return Err(SatpError::NetworkNotSupported(
                request.recipient_gateway_network_id.to_string(),
            ));
        }

        data.resource_url = request.common.resource_url.clone();
        data.client_gateway_id = request.client_gateway_id.clone();
        data.server_gateway_id = request.server_gateway_id.clone();
        data.sender_network = Some(request.sender_gateway_network_id.clone());
        data.receiver_network = Some(request.recipient_gateway_network_id.clone());
        info!(
            "[satp] Session {} opened by {}",
            data.id, request.client_gateway_id
        );
        Ok(())
    }

    /// Build the session response.
    pub async fn new_session_response(
        &self,
        data: &mut SessionData,
    ) -> Result<NewSessionResponse, SatpError> {
        let response = NewSessionResponse {
            common: self.response_header(data, MessageType::NewSessionResponse)?,
            server_gateway_id: self.ctx.config.gateway_id.clone(),
        };
        self.seal(data, response).await
    }

    /// Verify the pre-transfer request and adopt the assets it describes.
    pub async fn check_pre_satp_transfer_request(
        &self,
        request: &PreSatpTransferRequest,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, request, &[MessageType::PreSatpTransferRequest])
            .await?;

        if request.sender_asset.token_id.is_empty() {
            return Err(SatpError::LedgerAssetId {
                side: AssetSide::Sender,
            });
        }
        require_ontology(&request.receiver_asset, AssetSide::Receiver)?;
        if Some(&request.receiver_asset.network_id) != data.receiver_network.as_ref() {
            return Err(SatpError::NetworkNotSupported(
                request.receiver_asset.network_id.to_string(),
            ));
        }
        let claim = carried_claim(&request.wrap_assertion_claim, ClaimKind::SenderWrap)?;
        data.claims.set(ClaimKind::SenderWrap, claim);
        data.sender_asset = Some(request.sender_asset.clone());
        data.receiver_asset = Some(request.receiver_asset.clone());
        Ok(())
    }

    /// Wrap the receiver asset and build the pre-transfer response.
    pub async fn pre_satp_transfer_response(
        &self,
        data: &mut SessionData,
    ) -> Result<PreSatpTransferResponse, SatpError> {
        let message_type = MessageType::PreSatpTransferResponse;
        let receiver_asset = asset(data, AssetSide::Receiver)?.clone();
        let wrap_assertion_claim = self
            .assert_claim(
                data,
                ClaimKind::ReceiverWrap,
                message_type,
                &receiver_asset.network_id,
                BridgeCall::Wrap(receiver_asset.clone()),
            )
            .await?;

        let response = PreSatpTransferResponse {
            common: self.response_header(data, message_type)?,
            wrap_assertion_claim,
            recipient_token_id: receiver_asset.token_id,
        };
        self.seal(data, response).await
    }
}

/// The bridge drives an asset's contract through its ontology.
fn require_ontology(asset: &Asset, side: AssetSide) -> Result<(), SatpError> {
    match asset.ontology.as_deref() {
        Some(ontology) if !ontology.is_empty() => Ok(()),
        _ => Err(SatpError::OntologyContract { side }),
    }
}
