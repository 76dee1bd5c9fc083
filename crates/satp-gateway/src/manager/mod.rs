//! # Transfer Manager
//!
//! Owns the session store, serves the gateway's server side and drives
//! transfers on its client side.
//!
//! ## Step loop
//!
//! ```text
//! for step in resume_at(resume_from) ..= TransferComplete:
//!     answered already?      -> reuse stored response, next step
//!     request stored?        -> resend it unchanged
//!     else                   -> build it from the prior response
//!                               (in memory, else from the ledger)
//!     send, verify response, continue with it
//! ```
//!
//! A rebuilt request is byte-identical to the one first sent, so a server
//! that already processed it answers from its ledger.

pub mod errors;
pub mod recovery;
pub mod steps;
pub mod store;

pub use errors::{ManagerError, TransactError};
pub use recovery::CrashStatus;
pub use steps::{TransferProgress, TransferStep};
pub use store::{SessionHandle, SessionStore};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{
    now_millis, Asset, GatewayConfig, MessageType, Role, SatpError, SatpStage, Session,
    SessionData, SessionState,
};
use crate::handler::{ClientHandler, ServerHandler, StepOutcome};
use crate::messages::{SatpMessage, TransferProposalReceipt};
use crate::ports::outbound::{LogOperation, TransportError};
use crate::service::common::checkpoint;
use crate::service::ServiceContext;

/// Parameters of a transfer started by this gateway.
#[derive(Clone, Debug)]
pub struct TransferRequest {
    /// Business context the transfer belongs to.
    pub transfer_context_id: String,
    /// Counterpart gateway.
    pub server_gateway_id: String,
    /// Asset leaving the sender ledger.
    pub sender_asset: Asset,
    /// Asset to create on the receiver ledger.
    pub receiver_asset: Asset,
    /// Asset profile.
    pub asset_profile_id: String,
    /// Verified originator.
    pub originator: String,
    /// Verified beneficiary.
    pub beneficiary: String,
    /// Originator public key.
    pub originator_pubkey: String,
    /// Beneficiary public key.
    pub beneficiary_pubkey: String,
    /// Legal owner of the counterpart gateway.
    pub receiver_gateway_owner_id: String,
}

/// How a transfer ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Both ledgers committed.
    Completed {
        /// Final session id (the counterpart may have renumbered it).
        session_id: String,
    },
    /// The counterpart declined.
    Rejected {
        /// Final session id.
        session_id: String,
        /// Reason given.
        reason: String,
    },
}

impl TransferOutcome {
    /// Final session id.
    pub fn session_id(&self) -> &str {
        match self {
            TransferOutcome::Completed { session_id } => session_id,
            TransferOutcome::Rejected { session_id, .. } => session_id,
        }
    }
}

/// Snapshot of a session's progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferStatus {
    /// Session id.
    pub session_id: String,
    /// Coarse progress.
    pub progress: TransferProgress,
    /// Session state.
    pub state: SessionState,
    /// Stage of the latest recorded message.
    pub stage: Option<SatpStage>,
}

/// SATP gateway: session store, server handler and client driver.
pub struct SatpManager {
    ctx: Arc<ServiceContext>,
    sessions: Arc<SessionStore>,
    client: ClientHandler,
    server: Arc<ServerHandler>,
}

impl SatpManager {
    /// Manager with a fresh session store.
    pub fn new(ctx: ServiceContext) -> Self {
        Self::with_store(Arc::new(ctx), Arc::new(SessionStore::new()))
    }

    /// Manager over an existing store.
    pub fn with_store(ctx: Arc<ServiceContext>, sessions: Arc<SessionStore>) -> Self {
        Self {
            client: ClientHandler::new(ctx.clone()),
            server: Arc::new(ServerHandler::new(ctx.clone(), sessions.clone())),
            ctx,
            sessions,
        }
    }

    /// Handler counterparts call.
    pub fn server_handler(&self) -> Arc<ServerHandler> {
        self.server.clone()
    }

    /// Session store.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.ctx.config
    }

    /// Open a client session for `request`; returns its id.
    pub fn create_session(&self, request: TransferRequest) -> Result<String, SatpError> {
        let config = &self.ctx.config;
        let server_gateway_pubkey = self
            .ctx
            .directory
            .public_key(&request.server_gateway_id)
            .ok_or_else(|| SatpError::UnknownGateway(request.server_gateway_id.clone()))?;

        let mut session = Session::new_client(&request.transfer_context_id, &config.version)?;
        let data = session.data_mut(Role::Client)?;
        data.resource_url = config.resource_url.clone();
        data.client_gateway_id = config.gateway_id.clone();
        data.server_gateway_id = request.server_gateway_id;
        data.client_gateway_pubkey = config.public_key_hex();
        data.server_gateway_pubkey = server_gateway_pubkey;
        data.sender_network = Some(request.sender_asset.network_id.clone());
        data.receiver_network = Some(request.receiver_asset.network_id.clone());
        data.digital_asset_id = Some(request.sender_asset.token_id.clone());
        data.asset_profile_id = Some(request.asset_profile_id);
        data.originator = Some(request.originator);
        data.beneficiary = Some(request.beneficiary);
        data.originator_pubkey = Some(request.originator_pubkey);
        data.beneficiary_pubkey = Some(request.beneficiary_pubkey);
        data.sender_gateway_owner_id = Some(config.owner_id.clone());
        data.receiver_gateway_owner_id = Some(request.receiver_gateway_owner_id);
        data.sender_asset = Some(request.sender_asset);
        data.receiver_asset = Some(request.receiver_asset);

        let session_id = session.session_id().to_string();
        self.sessions.insert(session)?;
        info!(session_id = %session_id, "[satp] Client session created");
        Ok(session_id)
    }

    /// Drive a transfer from `resume_from` (or the start) to its end.
    pub async fn transfer(
        &self,
        session_id: &str,
        resume_from: Option<MessageType>,
    ) -> Result<TransferOutcome, TransactError> {
        let start = resume_from
            .map(TransferStep::resume_at)
            .unwrap_or(TransferStep::NewSession);
        let mut session_id = session_id.to_string();
        let mut prior: Option<SatpMessage> = None;
        info!(session_id = %session_id, step = %start, "[satp] Transfer started");

        for &step in start.remaining() {
            match self.run_step(&mut session_id, step, &mut prior).await {
                Ok(None) => {}
                Ok(Some(outcome)) => return Ok(outcome),
                Err(cause) => return Err(self.fail(&session_id, step, cause).await),
            }
        }

        match self.finish(&session_id).await {
            Ok(outcome) => Ok(outcome),
            Err(cause) => Err(self.fail(&session_id, TransferStep::TransferComplete, cause).await),
        }
    }

    /// Resume a transfer from where its ledger stops.
    pub async fn recover(&self, session_id: &str) -> Result<TransferOutcome, TransactError> {
        let resume_from = self.resume_point(session_id).await.map_err(|e| TransactError {
            session_id: session_id.to_string(),
            step: TransferStep::NewSession,
            cause: e.into(),
        })?;
        self.transfer(session_id, resume_from).await
    }

    /// Progress of a session.
    pub async fn status(&self, session_id: &str) -> Result<TransferStatus, SatpError> {
        let handle = self.sessions.require(session_id)?;
        let session = handle.lock().await;
        let data = projection(&session)?;
        Ok(TransferStatus {
            session_id: session.session_id().to_string(),
            progress: TransferProgress::of(data),
            state: data.state,
            stage: data.actual_stage(),
        })
    }

    /// Crash assessment of a session from its latest audit checkpoint.
    pub async fn check_crash(&self, session_id: &str) -> Result<CrashStatus, ManagerError> {
        let handle = self.sessions.require(session_id)?;
        let latest = self.ctx.audit.latest_entry(session_id).await?;
        let session = handle.lock().await;
        let data = projection(&session)?;
        let status = recovery::crash_status(
            latest.as_ref(),
            data,
            self.ctx.config.session_timeout_ms,
            now_millis(),
        );
        if status != CrashStatus::Idle {
            warn!(
                session_id = %session_id,
                stage = ?recovery::crashed_stage(data),
                "[satp] Session crash status {:?}",
                status
            );
        }
        Ok(status)
    }

    /// Message type a resumed transfer should start from.
    pub async fn resume_point(&self, session_id: &str) -> Result<Option<MessageType>, SatpError> {
        let handle = self.sessions.require(session_id)?;
        let session = handle.lock().await;
        Ok(recovery::resume_point(session.client_data()?))
    }

    /// One exchange. `None` means go on with the next step.
    ///
    /// The session lock is released while the request is in flight; the
    /// exchange lock is held throughout, so concurrent drivers of the same
    /// session take turns and find the step answered.
    async fn run_step(
        &self,
        session_id: &mut String,
        step: TransferStep,
        prior: &mut Option<SatpMessage>,
    ) -> Result<Option<TransferOutcome>, ManagerError> {
        let (handle, exchange) = self.sessions.require_exchange(session_id)?;
        let _turn = exchange.lock().await;

        let (request, server_gateway_id) = {
            let mut session = handle.lock().await;
            let data = session.data_mut(Role::Client)?;
            if let Some(outcome) = closed_outcome(data)? {
                return Ok(Some(outcome));
            }
            if let Some(answered) = answered(data, step) {
                debug!(session_id = %data.id, step = %step, "[satp] Step already answered");
                *prior = data.ledger.message(answered).cloned();
                return Ok(None);
            }
            data.verify_open()?;

            let request = match data.ledger.message(step.request_type()).cloned() {
                Some(stored) => {
                    debug!(session_id = %data.id, step = %step, "[satp] Resending stored request");
                    stored
                }
                None => {
                    let previous = prior.take().or_else(|| previous_response(data, step));
                    if previous.is_none() && step != TransferStep::NewSession {
                        return Err(ManagerError::RecoverMessage {
                            message_type: step.request_type(),
                        });
                    }
                    self.client
                        .build_request(step, data, previous.as_ref())
                        .await
                        .map_err(|cause| ManagerError::CreateSatpRequest {
                            message_type: step.request_type(),
                            cause,
                        })?
                }
            };
            (request, data.server_gateway_id.clone())
        };

        let response = self.send(step, &server_gateway_id, request).await?;

        let response_id = response.header().session_id.clone();
        if step == TransferStep::NewSession && response_id != *session_id {
            {
                let session = handle.lock().await;
                self.client
                    .verify_renumbering(&response, session.client_data()?)?;
            }
            self.sessions.rekey(session_id, &response_id)?;
            handle.lock().await.renumber(&response_id);
            info!(
                "[satp] Session {} renumbered to {} by counterpart",
                session_id, response_id
            );
            *session_id = response_id;
        }

        let mut session = handle.lock().await;
        let data = session.data_mut(Role::Client)?;
        match self.client.accept_response(step, &response, data).await? {
            StepOutcome::Continue => {
                *prior = Some(response);
                Ok(None)
            }
            StepOutcome::Rejected(reason) => Ok(Some(TransferOutcome::Rejected {
                session_id: session_id.clone(),
                reason,
            })),
        }
    }

    async fn send(
        &self,
        step: TransferStep,
        server_gateway_id: &str,
        request: SatpMessage,
    ) -> Result<SatpMessage, ManagerError> {
        let transport = self
            .ctx
            .directory
            .channel(server_gateway_id)
            .ok_or_else(|| SatpError::UnknownGateway(server_gateway_id.to_string()))?;
        let deadline = Duration::from_millis(self.ctx.config.session_timeout_ms);

        let sent = tokio::time::timeout(deadline, self.client.dispatch(transport.as_ref(), request))
            .await
            .unwrap_or(Err(TransportError::Timeout));
        match sent {
            Ok(response) => Ok(response),
            Err(TransportError::Remote(error)) => Err(ManagerError::Protocol(error.into_error())),
            Err(interrupted) => Err(ManagerError::RetrieveSatpMessage {
                message_type: step.request_type(),
                reason: interrupted.to_string(),
            }),
        }
    }

    async fn finish(&self, session_id: &str) -> Result<TransferOutcome, ManagerError> {
        let handle = self.sessions.require(session_id)?;
        let session = handle.lock().await;
        let data = session.client_data()?;
        closed_outcome(data)?.ok_or_else(|| {
            SatpError::SessionData(format!("{} ended in state {:?}", data.id, data.state)).into()
        })
    }

    /// Audit and record a failed step.
    async fn fail(&self, session_id: &str, step: TransferStep, cause: ManagerError) -> TransactError {
        warn!(
            session_id = %session_id,
            step = %step,
            recoverable = cause.is_recoverable(),
            "[satp] Transfer step failed: {}",
            cause
        );
        if let Some(handle) = self.sessions.get(session_id) {
            let mut session = handle.lock().await;
            if let Ok(data) = session.data_mut(Role::Client) {
                checkpoint(
                    self.ctx.audit.as_ref(),
                    data,
                    step.request_type(),
                    LogOperation::Fail,
                    cause.to_string(),
                )
                .await;
                if !cause.is_recoverable() {
                    if let ManagerError::Protocol(error)
                    | ManagerError::CreateSatpRequest { cause: error, .. } = &cause
                    {
                        data.set_error(error, step.request_type());
                    }
                }
            }
        }
        TransactError {
            session_id: session_id.to_string(),
            step,
            cause,
        }
    }
}

/// Client projection if held, else server projection.
fn projection(session: &Session) -> Result<&SessionData, SatpError> {
    session.client_data().or_else(|_| session.server_data())
}

/// Response of `step` already recorded, if any.
fn answered(data: &SessionData, step: TransferStep) -> Option<MessageType> {
    step.response_types()
        .iter()
        .copied()
        .find(|t| data.ledger.contains(*t))
}

/// Stored response closing the step before `step`.
fn previous_response(data: &SessionData, step: TransferStep) -> Option<SatpMessage> {
    let previous = TransferStep::ORDER.get(step.index().checked_sub(1)?)?;
    answered(data, *previous).and_then(|t| data.ledger.message(t).cloned())
}

/// Outcome of a session that can make no further progress.
fn closed_outcome(data: &SessionData) -> Result<Option<TransferOutcome>, SatpError> {
    match data.state {
        SessionState::Completed => Ok(Some(TransferOutcome::Completed {
            session_id: data.id.clone(),
        })),
        SessionState::Rejected => {
            let reason = data
                .ledger
                .message(MessageType::InitReject)
                .cloned()
                .and_then(|m| m.into_typed::<TransferProposalReceipt>().ok())
                .and_then(|m| m.reject_reason)
                .unwrap_or_else(|| "proposal rejected".to_string());
            Ok(Some(TransferOutcome::Rejected {
                session_id: data.id.clone(),
                reason,
            }))
        }
        SessionState::Error => Err(SatpError::SessionClosed(data.id.clone())),
        SessionState::Ongoing | SessionState::ConditionalRejected => Ok(None),
    }
}
