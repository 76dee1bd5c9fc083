//! # Inbound Ports
//!
//! The RPC surface a gateway exposes to its counterparts.

use async_trait::async_trait;

use crate::messages::*;

/// SATP server API - inbound port.
///
/// Each call returns the typed response or the `ErrorResponse` describing
/// why the request was refused.
#[async_trait]
pub trait SatpServerApi: Send + Sync {
    /// Stage 0: open a session.
    async fn new_session(
        &self,
        request: NewSessionRequest,
    ) -> Result<NewSessionResponse, ErrorResponse>;

    /// Stage 0: exchange wrapped assets.
    async fn pre_satp_transfer(
        &self,
        request: PreSatpTransferRequest,
    ) -> Result<PreSatpTransferResponse, ErrorResponse>;

    /// Stage 1: transfer proposal.
    async fn transfer_proposal(
        &self,
        request: TransferProposalRequest,
    ) -> Result<TransferProposalReceipt, ErrorResponse>;

    /// Stage 1: transfer commence.
    async fn transfer_commence(
        &self,
        request: TransferCommenceRequest,
    ) -> Result<TransferCommenceResponse, ErrorResponse>;

    /// Stage 2: lock assertion.
    async fn lock_assertion(
        &self,
        request: LockAssertionRequest,
    ) -> Result<LockAssertionReceipt, ErrorResponse>;

    /// Stage 3: commit preparation.
    async fn commit_preparation(
        &self,
        request: CommitPreparationRequest,
    ) -> Result<CommitReadyResponse, ErrorResponse>;

    /// Stage 3: commit final assertion.
    async fn commit_final_assertion(
        &self,
        request: CommitFinalAssertionRequest,
    ) -> Result<CommitFinalAcknowledgementReceipt, ErrorResponse>;

    /// Stage 3: transfer complete.
    async fn transfer_complete(
        &self,
        request: TransferCompleteRequest,
    ) -> Result<TransferCompleteResponse, ErrorResponse>;
}
