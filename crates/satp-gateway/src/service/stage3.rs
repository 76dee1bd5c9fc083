//! # Stage 3: Commitment
//!
//! ```text
//! client                                        server
//!   │── COMMIT_PREPARE ────────────────────────────▶│
//!   │                             mint(receiver asset)│
//!   │◀───────────────────────────────── COMMIT_READY ─│
//!   │   burn(sender asset)                           │
//!   │── COMMIT_FINAL ──────────────────────────────▶│
//!   │                           assign(receiver asset)│
//!   │◀────────────────────────────── ACK_COMMIT_FINAL ─│
//!   │── COMMIT_TRANSFER_COMPLETE ──────────────────▶│
//!   │◀─────────────── COMMIT_TRANSFER_COMPLETE_RESPONSE ─│
//! ```
//!
//! Both sides reach `COMPLETED` only after the last exchange.

use tracing::info;

use super::common::{asset, carried_claim, recorded_claim, BridgeCall};
use super::{ClientSide, ServerSide, Stage3, StageService};
use crate::domain::{AssetSide, ClaimKind, MessageType, SatpError, SessionData, SessionState};
use crate::messages::{
    CommitFinalAcknowledgementReceipt, CommitFinalAssertionRequest, CommitPreparationRequest,
    CommitReadyResponse, LockAssertionReceipt, TransferCompleteRequest, TransferCompleteResponse,
};

impl StageService<Stage3, ClientSide> {
    /// Ask the server to prepare the commitment.
    pub async fn commit_preparation_request(
        &self,
        data: &mut SessionData,
        prior: &LockAssertionReceipt,
    ) -> Result<CommitPreparationRequest, SatpError> {
        let message_type = MessageType::CommitPrepare;
        self.begin(data, message_type).await;
        recorded_claim(data, ClaimKind::Lock)?;

        let request = CommitPreparationRequest {
            common: self.request_header(data, message_type, Some(&prior.common))?,
        };
        self.seal(data, request).await
    }

    /// Verify the commit-ready response and record the mint claim.
    pub async fn check_commit_ready_response(
        &self,
        response: &CommitReadyResponse,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, response, &[MessageType::CommitReady])
            .await?;
        let claim = carried_claim(&response.mint_assertion_claim, ClaimKind::Mint)?;
        data.claims.set(ClaimKind::Mint, claim);
        Ok(())
    }

    /// Burn the sender asset and build the final assertion.
    pub async fn commit_final_assertion_request(
        &self,
        data: &mut SessionData,
        prior: &CommitReadyResponse,
    ) -> Result<CommitFinalAssertionRequest, SatpError> {
        let message_type = MessageType::CommitFinal;
        self.begin(data, message_type).await;

        let sender_asset = asset(data, AssetSide::Sender)?.clone();
        let burn_assertion_claim = self
            .assert_claim(
                data,
                ClaimKind::Burn,
                message_type,
                &sender_asset.network_id,
                BridgeCall::Burn {
                    asset_id: sender_asset.token_id.clone(),
                    amount: sender_asset.amount,
                },
            )
            .await?;

        let request = CommitFinalAssertionRequest {
            common: self.request_header(data, message_type, Some(&prior.common))?,
            burn_assertion_claim,
            burn_assertion_format: self.receipt_format(&sender_asset.network_id)?,
        };
        self.seal(data, request).await
    }

    /// Verify the final acknowledgement and record the assignment claim.
    pub async fn check_commit_final_acknowledgement(
        &self,
        response: &CommitFinalAcknowledgementReceipt,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, response, &[MessageType::AckCommitFinal])
            .await?;
        let claim = carried_claim(&response.assignment_assertion_claim, ClaimKind::Assignment)?;
        data.claims.set(ClaimKind::Assignment, claim);
        Ok(())
    }

    /// Build the completion request referencing the commence request.
    pub async fn transfer_complete_request(
        &self,
        data: &mut SessionData,
        prior: &CommitFinalAcknowledgementReceipt,
    ) -> Result<TransferCompleteRequest, SatpError> {
        let message_type = MessageType::CommitTransferComplete;
        self.begin(data, message_type).await;

        let hash_transfer_commence = commence_hash(data)?;
        let request = TransferCompleteRequest {
            common: self.request_header(data, message_type, Some(&prior.common))?,
            hash_transfer_commence,
        };
        self.seal(data, request).await
    }

    /// Verify the completion response and close the session.
    pub async fn check_transfer_complete_response(
        &self,
        response: &TransferCompleteResponse,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(
            data,
            response,
            &[MessageType::CommitTransferCompleteResponse],
        )
        .await?;
        data.transition(SessionState::Completed)?;
        info!("[satp] Session {} completed", data.id);
        Ok(())
    }
}

impl StageService<Stage3, ServerSide> {
    /// Verify the commit preparation. The lock must have been asserted.
    pub async fn check_commit_preparation_request(
        &self,
        request: &CommitPreparationRequest,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, request, &[MessageType::CommitPrepare])
            .await?;
        recorded_claim(data, ClaimKind::Lock)?;
        Ok(())
    }

    /// Mint the receiver asset and build the commit-ready response.
    pub async fn commit_ready_response(
        &self,
        data: &mut SessionData,
    ) -> Result<CommitReadyResponse, SatpError> {
        let message_type = MessageType::CommitReady;
        let receiver_asset = asset(data, AssetSide::Receiver)?.clone();
        let mint_assertion_claim = self
            .assert_claim(
                data,
                ClaimKind::Mint,
                message_type,
                &receiver_asset.network_id,
                BridgeCall::Mint {
                    asset_id: receiver_asset.token_id.clone(),
                    amount: receiver_asset.amount,
                },
            )
            .await?;

        let response = CommitReadyResponse {
            common: self.response_header(data, message_type)?,
            mint_assertion_claim,
            mint_assertion_format: self.receipt_format(&receiver_asset.network_id)?,
        };
        self.seal(data, response).await
    }

    /// Verify the final assertion and record the burn claim.
    pub async fn check_commit_final_assertion_request(
        &self,
        request: &CommitFinalAssertionRequest,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, request, &[MessageType::CommitFinal])
            .await?;
        let claim = carried_claim(&request.burn_assertion_claim, ClaimKind::Burn)?;
        data.claims.set(ClaimKind::Burn, claim);
        Ok(())
    }

    /// Assign the minted asset to its owner and acknowledge.
    pub async fn commit_final_acknowledgement(
        &self,
        data: &mut SessionData,
    ) -> Result<CommitFinalAcknowledgementReceipt, SatpError> {
        let message_type = MessageType::AckCommitFinal;
        let receiver_asset = asset(data, AssetSide::Receiver)?.clone();
        let assignment_assertion_claim = self
            .assert_claim(
                data,
                ClaimKind::Assignment,
                message_type,
                &receiver_asset.network_id,
                BridgeCall::Assign {
                    asset_id: receiver_asset.token_id.clone(),
                    recipient: receiver_asset.owner.clone(),
                    amount: receiver_asset.amount,
                },
            )
            .await?;

        let response = CommitFinalAcknowledgementReceipt {
            common: self.response_header(data, message_type)?,
            assignment_assertion_claim,
            assignment_assertion_format: self.receipt_format(&receiver_asset.network_id)?,
        };
        self.seal(data, response).await
    }

    /// Verify the completion request against the stored commence request.
    pub async fn check_transfer_complete_request(
        &self,
        request: &TransferCompleteRequest,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, request, &[MessageType::CommitTransferComplete])
            .await?;
        if request.hash_transfer_commence != commence_hash(data)? {
            return Err(SatpError::TransferCommenceHash);
        }
        Ok(())
    }

    /// Build the completion response and close the session.
    pub async fn transfer_complete_response(
        &self,
        data: &mut SessionData,
    ) -> Result<TransferCompleteResponse, SatpError> {
        let response = TransferCompleteResponse {
            common: self.response_header(data, MessageType::CommitTransferCompleteResponse)?,
        };
        let response = self.seal(data, response).await?;
        data.transition(SessionState::Completed)?;
        info!("[satp] Session {} completed", data.id);
        Ok(response)
    }
}

/// Stored hash of the commence request.
fn commence_hash(data: &SessionData) -> Result<String, SatpError> {
    data.ledger
        .hash(MessageType::TransferCommenceRequest)
        .map(str::to_string)
        .ok_or_else(|| SatpError::SessionData("no stored TRANSFER_COMMENCE_REQUEST".to_string()))
}
