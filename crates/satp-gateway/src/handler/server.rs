//! # Server Handler
//!
//! Implements `SatpServerApi` on top of the server-side stage services.
//!
//! Every RPC runs the same exchange under the session's lock:
//!
//! 1. a request identical to the stored one is a replay: the stored answer
//!    is returned, or built if the previous attempt stopped before it;
//! 2. otherwise the request is checked and recorded;
//! 3. the response is built, which may call a bridge.
//!
//! Failures are logged to the audit log and return as `ErrorResponse`.
//! Structural, integrity and negotiation failures also mark the session
//! `ERROR`; bridge and lookup failures leave it open for a retry.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{MessageType, Role, SatpError, Session, SessionData};
use crate::integrity::message_hash;
use crate::manager::store::{SessionHandle, SessionStore};
use crate::messages::*;
use crate::ports::inbound::SatpServerApi;
use crate::ports::outbound::LogOperation;
use crate::service::common::{checkpoint, stored};
use crate::service::{
    ServiceContext, Stage0ServerService, Stage1ServerService, Stage2ServerService,
    Stage3ServerService, StageService,
};

/// Server side of a gateway.
pub struct ServerHandler {
    ctx: Arc<ServiceContext>,
    sessions: Arc<SessionStore>,
    stage0: Stage0ServerService,
    stage1: Stage1ServerService,
    stage2: Stage2ServerService,
    stage3: Stage3ServerService,
}

impl ServerHandler {
    /// Handler serving sessions kept in `sessions`.
    pub fn new(ctx: Arc<ServiceContext>, sessions: Arc<SessionStore>) -> Self {
        Self {
            stage0: StageService::new(ctx.clone()),
            stage1: StageService::new(ctx.clone()),
            stage2: StageService::new(ctx.clone()),
            stage3: StageService::new(ctx.clone()),
            ctx,
            sessions,
        }
    }

    /// Session store.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Run an exchange on the session the request names.
    async fn serve<M: ServerExchange>(&self, request: M) -> Result<M::Response, ErrorResponse> {
        let header = request.header();
        let handle = self.sessions.require(&header.session_id).map_err(|e| {
            warn!("[satp] {} for unknown session {}", header.message_type, header.session_id);
            ErrorResponse::from_error(&header.session_id, header.message_type, &e)
        })?;
        self.serve_in(handle, request).await
    }

    async fn serve_in<M: ServerExchange>(
        &self,
        handle: SessionHandle,
        request: M,
    ) -> Result<M::Response, ErrorResponse> {
        let message_type = request.message_type();
        let mut session = handle.lock().await;
        let data = session
            .data_mut(Role::Server)
            .map_err(|e| ErrorResponse::from_error(&request.header().session_id, message_type, &e))?;

        match self.exchange(&request, data).await {
            Ok(response) => Ok(response),
            Err(error) => Err(self.fail(data, message_type, error).await),
        }
    }

    async fn exchange<M: ServerExchange>(
        &self,
        request: &M,
        data: &mut SessionData,
    ) -> Result<M::Response, SatpError> {
        let message_type = request.message_type();
        let hash = message_hash(request)?;

        if data.ledger.hash(message_type) == Some(hash.as_str()) {
            if let Some(answered) = M::RESPONSES.iter().find(|t| data.ledger.contains(**t)) {
                info!("[satp] Replaying {} for session {}", answered, data.id);
                return stored(data, *answered);
            }
            data.verify_open()?;
            info!("[satp] Resuming {} for session {}", message_type, data.id);
        } else {
            request.accept(self, data).await?;
        }
        M::answer(self, data).await
    }

    async fn fail(
        &self,
        data: &mut SessionData,
        message_type: MessageType,
        error: SatpError,
    ) -> ErrorResponse {
        warn!(
            session_id = %data.id,
            code = error.code(),
            "[satp] {} refused: {}",
            message_type, error
        );
        checkpoint(
            self.ctx.audit.as_ref(),
            data,
            message_type,
            LogOperation::Fail,
            error.to_string(),
        )
        .await;
        if error.is_fatal_for_session() {
            data.set_error(&error, message_type);
        }
        ErrorResponse::from_error(&data.id, message_type, &error)
    }

    /// Session a `NewSessionRequest` belongs to, created if new.
    ///
    /// A request already accepted (possibly under a renumbered id) maps to
    /// its session. A new request whose id is taken gets a fresh id. A
    /// second, different request for a context already served is refused.
    async fn open_session(&self, request: &NewSessionRequest) -> Result<SessionHandle, SatpError> {
        let header = &request.common;
        let hash = message_hash(request)?;

        let mut served = false;
        for (_, handle) in self.sessions.find_by_context(&header.transfer_context_id) {
            let session = handle.lock().await;
            let Ok(data) = session.server_data() else {
                continue;
            };
            if data.ledger.hash(MessageType::NewSessionRequest) == Some(hash.as_str()) {
                drop(session);
                return Ok(handle);
            }
            served = true;
        }
        if served {
            return Err(SatpError::SessionMissMatch {
                session_id: header.session_id.clone(),
            });
        }

        let client_gateway_pubkey = self
            .ctx
            .directory
            .public_key(&request.client_gateway_id)
            .ok_or_else(|| SatpError::UnknownGateway(request.client_gateway_id.clone()))?;

        let id = if self.sessions.get(&header.session_id).is_some() {
            let id = Session::generate_id(&header.transfer_context_id);
            info!(
                "[satp] Session id {} taken, answering as {}",
                header.session_id, id
            );
            id
        } else {
            header.session_id.clone()
        };

        let mut session = Session::new_server(
            &id,
            &header.transfer_context_id,
            &self.ctx.config.version,
        )?;
        let data = session.data_mut(Role::Server)?;
        data.client_gateway_pubkey = client_gateway_pubkey;
        data.server_gateway_pubkey = self.ctx.config.public_key_hex();
        self.sessions.insert(session)
    }
}

/// One request/response pair served by `ServerHandler`.
#[async_trait]
trait ServerExchange: ProtocolMessage {
    type Response: ProtocolMessage;

    /// Types the response may carry.
    const RESPONSES: &'static [MessageType];

    /// Check and record the request.
    async fn accept(&self, handler: &ServerHandler, data: &mut SessionData)
        -> Result<(), SatpError>;

    /// Build the response.
    async fn answer(
        handler: &ServerHandler,
        data: &mut SessionData,
    ) -> Result<Self::Response, SatpError>;
}

macro_rules! server_exchange {
    ($request:ty => $response:ty, [$($answer:ident),+], $stage:ident, $check:ident, $build:ident) => {
        #[async_trait]
        impl ServerExchange for $request {
            type Response = $response;

            const RESPONSES: &'static [MessageType] = &[$(MessageType::$answer),+];

            async fn accept(
                &self,
                handler: &ServerHandler,
                data: &mut SessionData,
            ) -> Result<(), SatpError> {
                handler.$stage.$check(self, data).await
            }

            async fn answer(
                handler: &ServerHandler,
                data: &mut SessionData,
            ) -> Result<$response, SatpError> {
                handler.$stage.$build(data).await
            }
        }
    };
}

server_exchange!(
    NewSessionRequest => NewSessionResponse, [NewSessionResponse],
    stage0, check_new_session_request, new_session_response
);
server_exchange!(
    PreSatpTransferRequest => PreSatpTransferResponse, [PreSatpTransferResponse],
    stage0, check_pre_satp_transfer_request, pre_satp_transfer_response
);
server_exchange!(
    TransferProposalRequest => TransferProposalReceipt, [InitReceipt, InitReject],
    stage1, check_transfer_proposal_request, transfer_proposal_response
);
server_exchange!(
    TransferCommenceRequest => TransferCommenceResponse, [TransferCommenceResponse],
    stage1, check_transfer_commence_request, transfer_commence_response
);
server_exchange!(
    LockAssertionRequest => LockAssertionReceipt, [AssertionReceipt],
    stage2, check_lock_assertion_request, lock_assertion_receipt
);
server_exchange!(
    CommitPreparationRequest => CommitReadyResponse, [CommitReady],
    stage3, check_commit_preparation_request, commit_ready_response
);
server_exchange!(
    CommitFinalAssertionRequest => CommitFinalAcknowledgementReceipt, [AckCommitFinal],
    stage3, check_commit_final_assertion_request, commit_final_acknowledgement
);
server_exchange!(
    TransferCompleteRequest => TransferCompleteResponse, [CommitTransferCompleteResponse],
    stage3, check_transfer_complete_request, transfer_complete_response
);

#[async_trait]
impl SatpServerApi for ServerHandler {
    async fn new_session(
        &self,
        request: NewSessionRequest,
    ) -> Result<NewSessionResponse, ErrorResponse> {
        let handle = self.open_session(&request).await.map_err(|e| {
            warn!(
                "[satp] New session {} refused: {}",
                request.common.session_id, e
            );
            ErrorResponse::from_error(
                &request.common.session_id,
                MessageType::NewSessionRequest,
                &e,
            )
        })?;
        self.serve_in(handle, request).await
    }

    async fn pre_satp_transfer(
        &self,
        request: PreSatpTransferRequest,
    ) -> Result<PreSatpTransferResponse, ErrorResponse> {
        self.serve(request).await
    }

    async fn transfer_proposal(
        &self,
        request: TransferProposalRequest,
    ) -> Result<TransferProposalReceipt, ErrorResponse> {
        self.serve(request).await
    }

    async fn transfer_commence(
        &self,
        request: TransferCommenceRequest,
    ) -> Result<TransferCommenceResponse, ErrorResponse> {
        self.serve(request).await
    }

    async fn lock_assertion(
        &self,
        request: LockAssertionRequest,
    ) -> Result<LockAssertionReceipt, ErrorResponse> {
        self.serve(request).await
    }

    async fn commit_preparation(
        &self,
        request: CommitPreparationRequest,
    ) -> Result<CommitReadyResponse, ErrorResponse> {
        self.serve(request).await
    }

    async fn commit_final_assertion(
        &self,
        request: CommitFinalAssertionRequest,
    ) -> Result<CommitFinalAcknowledgementReceipt, ErrorResponse> {
        self.serve(request).await
    }

    async fn transfer_complete(
        &self,
        request: TransferCompleteRequest,
    ) -> Result<TransferCompleteResponse, ErrorResponse> {
        self.serve(request).await
    }
}
