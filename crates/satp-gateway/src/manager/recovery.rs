//! # Crash Recovery
//!
//! Where a session stands, derived from its integrity ledger, and whether
//! its audit trail shows an interrupted operation.

use crate::domain::{MessageType, SatpStage, SessionData};
use crate::ports::outbound::{LogEntry, LogOperation};

/// Crash assessment of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrashStatus {
    /// Nothing interrupted.
    Idle,
    /// The latest checkpoint never reached `done`; the transfer can resume.
    InRecovery,
    /// The session stalled past its timeout and must be rolled back.
    InRollback,
}

/// Classify a session from its latest audit checkpoint.
pub fn crash_status(
    latest: Option<&LogEntry>,
    data: &SessionData,
    session_timeout_ms: u64,
    now: u64,
) -> CrashStatus {
    let Some(entry) = latest else {
        return CrashStatus::Idle;
    };
    if entry.operation != LogOperation::Done {
        return CrashStatus::InRecovery;
    }
    if !data.state.is_terminal() && now.saturating_sub(entry.timestamp) > session_timeout_ms {
        return CrashStatus::InRollback;
    }
    CrashStatus::Idle
}

/// Stage of the latest recorded message.
pub fn crashed_stage(data: &SessionData) -> Option<SatpStage> {
    data.actual_stage()
}

/// Message type a resumed transfer should start from, if any.
pub fn resume_point(data: &SessionData) -> Option<MessageType> {
    if data.state.is_terminal() {
        return None;
    }
    data.ledger.last_type()
}
