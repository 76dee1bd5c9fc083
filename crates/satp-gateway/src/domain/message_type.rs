//! # Message Types and Stages
//!
//! The closed set of protocol message types, the stage each belongs to, and
//! the predecessor relation that drives hash chaining.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SatpStage {
    /// Session establishment and asset wrapping.
    Stage0,
    /// Transfer proposal and commence.
    Stage1,
    /// Lock assertion.
    Stage2,
    /// Commit and completion.
    Stage3,
}

impl SatpStage {
    /// Numeric stage index.
    pub fn index(self) -> u8 {
        match self {
            SatpStage::Stage0 => 0,
            SatpStage::Stage1 => 1,
            SatpStage::Stage2 => 2,
            SatpStage::Stage3 => 3,
        }
    }
}

impl fmt::Display for SatpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage-{}", self.index())
    }
}

/// Every message type exchanged during a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Stage 0: client opens a session.
    NewSessionRequest,
    /// Stage 0: server acknowledges (possibly renumbering) the session.
    NewSessionResponse,
    /// Stage 0: client presents assets and its wrap claim.
    PreSatpTransferRequest,
    /// Stage 0: server presents its wrap claim.
    PreSatpTransferResponse,
    /// Stage 1: transfer proposal with claims and capabilities.
    InitProposal,
    /// Stage 1: proposal accepted.
    InitReceipt,
    /// Stage 1: proposal rejected, optionally with counter-claims.
    InitReject,
    /// Stage 1: client commits to the agreed claims.
    TransferCommenceRequest,
    /// Stage 1: server acknowledges commence.
    TransferCommenceResponse,
    /// Stage 2: client asserts the sender asset is locked.
    LockAssert,
    /// Stage 2: server receipt for the lock assertion.
    AssertionReceipt,
    /// Stage 3: client asks the server to prepare the commit.
    CommitPrepare,
    /// Stage 3: server reports the mint.
    CommitReady,
    /// Stage 3: client reports the burn.
    CommitFinal,
    /// Stage 3: server reports the assignment.
    AckCommitFinal,
    /// Stage 3: client closes the transfer.
    CommitTransferComplete,
    /// Stage 3: server confirms completion.
    CommitTransferCompleteResponse,
}

impl MessageType {
    /// All message types in protocol order.
    pub const ALL: [MessageType; 17] = [
        MessageType::NewSessionRequest,
        MessageType::NewSessionResponse,
        MessageType::PreSatpTransferRequest,
        MessageType::PreSatpTransferResponse,
        MessageType::InitProposal,
        MessageType::InitReceipt,
        MessageType::InitReject,
        MessageType::TransferCommenceRequest,
        MessageType::TransferCommenceResponse,
        MessageType::LockAssert,
        MessageType::AssertionReceipt,
        MessageType::CommitPrepare,
        MessageType::CommitReady,
        MessageType::CommitFinal,
        MessageType::AckCommitFinal,
        MessageType::CommitTransferComplete,
        MessageType::CommitTransferCompleteResponse,
    ];

    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::NewSessionRequest => "NEW_SESSION_REQUEST",
            MessageType::NewSessionResponse => "NEW_SESSION_RESPONSE",
            MessageType::PreSatpTransferRequest => "PRE_SATP_TRANSFER_REQUEST",
            MessageType::PreSatpTransferResponse => "PRE_SATP_TRANSFER_RESPONSE",
            MessageType::InitProposal => "INIT_PROPOSAL",
            MessageType::InitReceipt => "INIT_RECEIPT",
            MessageType::InitReject => "INIT_REJECT",
            MessageType::TransferCommenceRequest => "TRANSFER_COMMENCE_REQUEST",
            MessageType::TransferCommenceResponse => "TRANSFER_COMMENCE_RESPONSE",
            MessageType::LockAssert => "LOCK_ASSERT",
            MessageType::AssertionReceipt => "ASSERTION_RECEIPT",
            MessageType::CommitPrepare => "COMMIT_PREPARE",
            MessageType::CommitReady => "COMMIT_READY",
            MessageType::CommitFinal => "COMMIT_FINAL",
            MessageType::AckCommitFinal => "ACK_COMMIT_FINAL",
            MessageType::CommitTransferComplete => "COMMIT_TRANSFER_COMPLETE",
            MessageType::CommitTransferCompleteResponse => "COMMIT_TRANSFER_COMPLETE_RESPONSE",
        }
    }

    /// Stage the message belongs to.
    pub fn stage(self) -> SatpStage {
        use MessageType::*;
        match self {
            NewSessionRequest | NewSessionResponse | PreSatpTransferRequest
            | PreSatpTransferResponse => SatpStage::Stage0,
            InitProposal | InitReceipt | InitReject | TransferCommenceRequest
            | TransferCommenceResponse => SatpStage::Stage1,
            LockAssert | AssertionReceipt => SatpStage::Stage2,
            CommitPrepare | CommitReady | CommitFinal | AckCommitFinal | CommitTransferComplete
            | CommitTransferCompleteResponse => SatpStage::Stage3,
        }
    }

    /// Whether the client sends this type.
    pub fn is_request(self) -> bool {
        use MessageType::*;
        matches!(
            self,
            NewSessionRequest
                | PreSatpTransferRequest
                | InitProposal
                | TransferCommenceRequest
                | LockAssert
                | CommitPrepare
                | CommitFinal
                | CommitTransferComplete
        )
    }

    /// The type whose stored hash this type must carry in `hashPreviousMessage`.
    ///
    /// `TransferCommenceRequest` follows whichever Stage 1 answer was
    /// received, so the caller states whether it was a rejection.
    pub fn previous(self, after_reject: bool) -> Option<MessageType> {
        use MessageType::*;
        match self {
            NewSessionRequest => None,
            NewSessionResponse => Some(NewSessionRequest),
            PreSatpTransferRequest => Some(NewSessionResponse),
            PreSatpTransferResponse => Some(PreSatpTransferRequest),
            InitProposal => Some(PreSatpTransferResponse),
            InitReceipt | InitReject => Some(InitProposal),
            TransferCommenceRequest if after_reject => Some(InitReject),
            TransferCommenceRequest => Some(InitReceipt),
            TransferCommenceResponse => Some(TransferCommenceRequest),
            LockAssert => Some(TransferCommenceResponse),
            AssertionReceipt => Some(LockAssert),
            CommitPrepare => Some(AssertionReceipt),
            CommitReady => Some(CommitPrepare),
            CommitFinal => Some(CommitReady),
            AckCommitFinal => Some(CommitFinal),
            CommitTransferComplete => Some(AckCommitFinal),
            CommitTransferCompleteResponse => Some(CommitTransferComplete),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
