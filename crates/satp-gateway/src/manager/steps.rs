//! # Transfer Steps
//!
//! The client drives a transfer as eight request/response exchanges in a
//! fixed order. Each step owns one request type and the response type(s)
//! answering it.

use std::fmt;

use crate::domain::{MessageType, SatpStage, SessionData, SessionState};

/// One request/response exchange of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransferStep {
    /// `NEW_SESSION_REQUEST` / `NEW_SESSION_RESPONSE`
    NewSession,
    /// `PRE_SATP_TRANSFER_REQUEST` / `PRE_SATP_TRANSFER_RESPONSE`
    PreSatpTransfer,
    /// `INIT_PROPOSAL` / `INIT_RECEIPT` or `INIT_REJECT`
    TransferProposal,
    /// `TRANSFER_COMMENCE_REQUEST` / `TRANSFER_COMMENCE_RESPONSE`
    TransferCommence,
    /// `LOCK_ASSERT` / `ASSERTION_RECEIPT`
    LockAssertion,
    /// `COMMIT_PREPARE` / `COMMIT_READY`
    CommitPreparation,
    /// `COMMIT_FINAL` / `ACK_COMMIT_FINAL`
    CommitFinalAssertion,
    /// `COMMIT_TRANSFER_COMPLETE` / `COMMIT_TRANSFER_COMPLETE_RESPONSE`
    TransferComplete,
}

impl TransferStep {
    /// Steps in execution order.
    pub const ORDER: [TransferStep; 8] = [
        TransferStep::NewSession,
        TransferStep::PreSatpTransfer,
        TransferStep::TransferProposal,
        TransferStep::TransferCommence,
        TransferStep::LockAssertion,
        TransferStep::CommitPreparation,
        TransferStep::CommitFinalAssertion,
        TransferStep::TransferComplete,
    ];

    /// Request sent by the step.
    pub fn request_type(self) -> MessageType {
        match self {
            TransferStep::NewSession => MessageType::NewSessionRequest,
            TransferStep::PreSatpTransfer => MessageType::PreSatpTransferRequest,
            TransferStep::TransferProposal => MessageType::InitProposal,
            TransferStep::TransferCommence => MessageType::TransferCommenceRequest,
            TransferStep::LockAssertion => MessageType::LockAssert,
            TransferStep::CommitPreparation => MessageType::CommitPrepare,
            TransferStep::CommitFinalAssertion => MessageType::CommitFinal,
            TransferStep::TransferComplete => MessageType::CommitTransferComplete,
        }
    }

    /// Response types that close the step.
    pub fn response_types(self) -> &'static [MessageType] {
        match self {
            TransferStep::NewSession => &[MessageType::NewSessionResponse],
            TransferStep::PreSatpTransfer => &[MessageType::PreSatpTransferResponse],
            TransferStep::TransferProposal => &[MessageType::InitReceipt, MessageType::InitReject],
            TransferStep::TransferCommence => &[MessageType::TransferCommenceResponse],
            TransferStep::LockAssertion => &[MessageType::AssertionReceipt],
            TransferStep::CommitPreparation => &[MessageType::CommitReady],
            TransferStep::CommitFinalAssertion => &[MessageType::AckCommitFinal],
            TransferStep::TransferComplete => &[MessageType::CommitTransferCompleteResponse],
        }
    }

    /// Stage the step belongs to.
    pub fn stage(self) -> SatpStage {
        self.request_type().stage()
    }

    /// Step owning `message_type`, whether request or response.
    pub fn resume_at(message_type: MessageType) -> TransferStep {
        Self::ORDER
            .into_iter()
            .find(|step| {
                step.request_type() == message_type || step.response_types().contains(&message_type)
            })
            .unwrap_or(TransferStep::NewSession)
    }

    /// Position in `ORDER`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Steps from `self` to the end.
    pub fn remaining(self) -> &'static [TransferStep] {
        &Self::ORDER[self.index()..]
    }
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferStep::NewSession => "newSession",
            TransferStep::PreSatpTransfer => "preSatpTransfer",
            TransferStep::TransferProposal => "transferProposal",
            TransferStep::TransferCommence => "transferCommence",
            TransferStep::LockAssertion => "lockAssertion",
            TransferStep::CommitPreparation => "commitPreparation",
            TransferStep::CommitFinalAssertion => "commitFinalAssertion",
            TransferStep::TransferComplete => "transferComplete",
        };
        f.write_str(name)
    }
}

/// Coarse progress of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferProgress {
    /// Nothing exchanged yet.
    NotStarted,
    /// Session establishment under way.
    Stage0InProgress,
    /// Transfer agreement under way.
    Stage1InProgress,
    /// Lock evidence under way.
    Stage2InProgress,
    /// Commitment under way.
    Stage3InProgress,
    /// Transfer completed.
    Completed,
    /// Transfer ended by a negotiated rejection.
    Rejected,
    /// Transfer stopped by an error.
    Failed,
}

impl TransferProgress {
    /// Progress of a session projection.
    pub fn of(data: &SessionData) -> Self {
        match data.state {
            SessionState::Completed => return TransferProgress::Completed,
            SessionState::Rejected => return TransferProgress::Rejected,
            SessionState::Error => return TransferProgress::Failed,
            SessionState::Ongoing | SessionState::ConditionalRejected => {}
        }
        match data.actual_stage() {
            None => TransferProgress::NotStarted,
            Some(SatpStage::Stage0) => TransferProgress::Stage0InProgress,
            Some(SatpStage::Stage1) => TransferProgress::Stage1InProgress,
            Some(SatpStage::Stage2) => TransferProgress::Stage2InProgress,
            Some(SatpStage::Stage3) => TransferProgress::Stage3InProgress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_an_owning_step() {
        for message_type in MessageType::ALL {
            let step = TransferStep::resume_at(message_type);
            assert!(
                step.request_type() == message_type
                    || step.response_types().contains(&message_type),
                "{message_type} resolved to {step}"
            );
        }
    }

    #[test]
    fn test_resume_at_response_stays_on_step() {
        assert_eq!(
            TransferStep::resume_at(MessageType::CommitReady),
            TransferStep::CommitPreparation
        );
        assert_eq!(
            TransferStep::resume_at(MessageType::InitReject),
            TransferStep::TransferProposal
        );
    }

    #[test]
    fn test_order_and_remaining() {
        assert_eq!(TransferStep::NewSession.remaining().len(), 8);
        assert_eq!(TransferStep::TransferComplete.remaining(), &[TransferStep::TransferComplete]);
        assert_eq!(TransferStep::LockAssertion.remaining().len(), 4);
        assert_eq!(TransferStep::LockAssertion.stage(), SatpStage::Stage2);
        for (i, step) in TransferStep::ORDER.iter().enumerate() {
            assert_eq!(step.index(), i);
        }
    }

    #[test]
    fn test_progress_follows_state_then_ledger() {
        let mut data = SessionData::new("s", "ctx", "v02");
        assert_eq!(TransferProgress::of(&data), TransferProgress::NotStarted);

        data.state = SessionState::Rejected;
        assert_eq!(TransferProgress::of(&data), TransferProgress::Rejected);
        data.state = SessionState::Error;
        assert_eq!(TransferProgress::of(&data), TransferProgress::Failed);
    }
}
