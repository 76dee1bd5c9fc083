//! Manager errors.

use thiserror::Error;

use super::steps::TransferStep;
use crate::domain::{ErrorClass, MessageType, SatpError};
use crate::ports::outbound::AuditError;

/// Why a step could not be completed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ManagerError {
    /// The request of the step could not be built.
    #[error("Failed to create {message_type}: {cause}")]
    CreateSatpRequest {
        /// Request type.
        message_type: MessageType,
        /// Builder failure.
        cause: SatpError,
    },

    /// No response arrived for the request.
    #[error("No response to {message_type}: {reason}")]
    RetrieveSatpMessage {
        /// Request type.
        message_type: MessageType,
        /// Transport failure.
        reason: String,
    },

    /// Neither the request nor the response it answers is stored.
    #[error("Cannot recover {message_type}: no stored request or prior response")]
    RecoverMessage {
        /// Request type.
        message_type: MessageType,
    },

    /// Protocol failure, local or reported by the counterpart.
    #[error(transparent)]
    Protocol(#[from] SatpError),

    /// Audit log could not be read.
    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl ManagerError {
    /// Whether retrying the transfer from the same step may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ManagerError::RetrieveSatpMessage { .. } | ManagerError::Audit(_) => true,
            ManagerError::RecoverMessage { .. } => false,
            ManagerError::CreateSatpRequest { cause, .. } => recoverable(cause),
            ManagerError::Protocol(cause) => recoverable(cause),
        }
    }
}

fn recoverable(error: &SatpError) -> bool {
    match error {
        // infrastructure codes reported by the counterpart
        SatpError::Rejected { code, .. } => (400..500).contains(code),
        other => other.class() == ErrorClass::Infrastructure,
    }
}

/// Failure of `SatpManager::transfer`.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Transfer {session_id} failed at {step}: {cause}")]
pub struct TransactError {
    /// Session being driven.
    pub session_id: String,
    /// Step that failed.
    pub step: TransferStep,
    /// What went wrong.
    pub cause: ManagerError,
}

impl TransactError {
    /// Whether `transfer` may be called again with this step as resume point.
    pub fn is_recoverable(&self) -> bool {
        self.cause.is_recoverable()
    }

    /// Resume point for the next `transfer` call.
    pub fn resume_from(&self) -> MessageType {
        self.step.request_type()
    }
}
