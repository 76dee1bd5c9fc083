//! # Client Handler
//!
//! Step-level view of the client-side stage services, used by the manager:
//! build the request of a step, send it over a transport, and accept the
//! response. Messages cross this boundary as `SatpMessage` so the manager
//! can keep one loop over all steps.

use std::sync::Arc;

use shared_crypto::sha256_hex;

use crate::domain::{SatpError, SessionData, SessionState};
use crate::manager::steps::TransferStep;
use crate::messages::*;
use crate::ports::outbound::{GatewayTransport, TransportError};
use crate::service::{
    ProposalOutcome, ServiceContext, Stage0ClientService, Stage1ClientService,
    Stage2ClientService, Stage3ClientService, StageService,
};

/// What the manager does after a step's response was accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Go on with the next step.
    Continue,
    /// The counterpart declined the transfer.
    Rejected(String),
}

/// Client side of a gateway.
pub struct ClientHandler {
    stage0: Stage0ClientService,
    stage1: Stage1ClientService,
    stage2: Stage2ClientService,
    stage3: Stage3ClientService,
}

impl ClientHandler {
    /// Handler over a shared context.
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            stage0: StageService::new(ctx.clone()),
            stage1: StageService::new(ctx.clone()),
            stage2: StageService::new(ctx.clone()),
            stage3: StageService::new(ctx),
        }
    }

    /// Build, sign and record the request of `step`.
    ///
    /// `prior` is the response closing the previous step; only
    /// `NewSession` may go without one.
    pub async fn build_request(
        &self,
        step: TransferStep,
        data: &mut SessionData,
        prior: Option<&SatpMessage>,
    ) -> Result<SatpMessage, SatpError> {
        let request: SatpMessage = match step {
            TransferStep::NewSession => self.stage0.new_session_request(data).await?.into(),
            TransferStep::PreSatpTransfer => self
                .stage0
                .pre_satp_transfer_request(data, &typed(prior, step)?)
                .await?
                .into(),
            TransferStep::TransferProposal => self
                .stage1
                .transfer_proposal_request(data, &typed(prior, step)?)
                .await?
                .into(),
            TransferStep::TransferCommence => self
                .stage1
                .transfer_commence_request(data, &typed(prior, step)?)
                .await?
                .into(),
            TransferStep::LockAssertion => self
                .stage2
                .lock_assertion_request(data, &typed(prior, step)?)
                .await?
                .into(),
            TransferStep::CommitPreparation => self
                .stage3
                .commit_preparation_request(data, &typed(prior, step)?)
                .await?
                .into(),
            TransferStep::CommitFinalAssertion => self
                .stage3
                .commit_final_assertion_request(data, &typed(prior, step)?)
                .await?
                .into(),
            TransferStep::TransferComplete => self
                .stage3
                .transfer_complete_request(data, &typed(prior, step)?)
                .await?
                .into(),
        };
        Ok(request)
    }

    /// Send a request and return the counterpart's response.
    pub async fn dispatch(
        &self,
        transport: &dyn GatewayTransport,
        request: SatpMessage,
    ) -> Result<SatpMessage, TransportError> {
        let response: SatpMessage = match request {
            SatpMessage::NewSessionRequest(m) => transport.new_session(m).await?.into(),
            SatpMessage::PreSatpTransferRequest(m) => transport.pre_satp_transfer(m).await?.into(),
            SatpMessage::TransferProposalRequest(m) => transport.transfer_proposal(m).await?.into(),
            SatpMessage::TransferCommenceRequest(m) => transport.transfer_commence(m).await?.into(),
            SatpMessage::LockAssertionRequest(m) => transport.lock_assertion(m).await?.into(),
            SatpMessage::CommitPreparationRequest(m) => {
                transport.commit_preparation(m).await?.into()
            }
            SatpMessage::CommitFinalAssertionRequest(m) => {
                transport.commit_final_assertion(m).await?.into()
            }
            SatpMessage::TransferCompleteRequest(m) => transport.transfer_complete(m).await?.into(),
            other => {
                return Err(TransportError::Unavailable(format!(
                    "{} is not a request",
                    other.message_type()
                )))
            }
        };
        Ok(response)
    }

    /// Verify a `NewSession` response that renames the session, before
    /// the new id is adopted.
    pub fn verify_renumbering(
        &self,
        response: &SatpMessage,
        data: &SessionData,
    ) -> Result<(), SatpError> {
        self.stage0
            .verify_renumbering(&response.clone().into_typed()?, data)
    }

    /// Verify and record the response closing `step`.
    ///
    /// A response identical to the one already recorded is accepted again
    /// without side effects.
    pub async fn accept_response(
        &self,
        step: TransferStep,
        response: &SatpMessage,
        data: &mut SessionData,
    ) -> Result<StepOutcome, SatpError> {
        if let Some(outcome) = already_accepted(response, data)? {
            return Ok(outcome);
        }
        let response = response.clone();
        match step {
            TransferStep::NewSession => {
                self.stage0
                    .check_new_session_response(&response.into_typed()?, data)
                    .await?
            }
            TransferStep::PreSatpTransfer => {
                self.stage0
                    .check_pre_satp_transfer_response(&response.into_typed()?, data)
                    .await?
            }
            TransferStep::TransferProposal => {
                let outcome = self
                    .stage1
                    .check_transfer_proposal_response(&response.into_typed()?, data)
                    .await?;
                if let ProposalOutcome::Rejected(reason) = outcome {
                    return Ok(StepOutcome::Rejected(reason));
                }
            }
            TransferStep::TransferCommence => {
                self.stage1
                    .check_transfer_commence_response(&response.into_typed()?, data)
                    .await?
            }
            TransferStep::LockAssertion => {
                self.stage2
                    .check_lock_assertion_receipt(&response.into_typed()?, data)
                    .await?
            }
            TransferStep::CommitPreparation => {
                self.stage3
                    .check_commit_ready_response(&response.into_typed()?, data)
                    .await?
            }
            TransferStep::CommitFinalAssertion => {
                self.stage3
                    .check_commit_final_acknowledgement(&response.into_typed()?, data)
                    .await?
            }
            TransferStep::TransferComplete => {
                self.stage3
                    .check_transfer_complete_response(&response.into_typed()?, data)
                    .await?
            }
        }
        Ok(StepOutcome::Continue)
    }
}

/// Outcome of a response already in the ledger, byte for byte.
fn already_accepted(
    response: &SatpMessage,
    data: &SessionData,
) -> Result<Option<StepOutcome>, SatpError> {
    let hash = sha256_hex(&response.canonical_bytes()?);
    if data.ledger.hash(response.message_type()) != Some(hash.as_str()) {
        return Ok(None);
    }
    if data.state != SessionState::Rejected {
        return Ok(Some(StepOutcome::Continue));
    }
    let reason = response
        .clone()
        .into_typed::<TransferProposalReceipt>()
        .ok()
        .and_then(|receipt| receipt.reject_reason)
        .unwrap_or_else(|| "proposal rejected".to_string());
    Ok(Some(StepOutcome::Rejected(reason)))
}

/// Prior response of `step` as the type its builder expects.
fn typed<M: ProtocolMessage>(prior: Option<&SatpMessage>, step: TransferStep) -> Result<M, SatpError> {
    prior
        .cloned()
        .ok_or_else(|| SatpError::SessionData(format!("no prior response for {step}")))?
        .into_typed()
}
