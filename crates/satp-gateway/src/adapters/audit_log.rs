//! In-memory audit log.
//!
//! Implements `AuditLog` with per-session append-only vectors.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::ports::outbound::{AuditError, AuditLog, LogEntry, ProofEntry};

/// Audit log kept in process memory.
#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<HashMap<String, Vec<LogEntry>>>,
    proofs: RwLock<HashMap<String, Vec<ProofEntry>>>,
}

impl InMemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkpoints of a session in append order.
    pub fn entries(&self, session_id: &str) -> Vec<LogEntry> {
        self.entries
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Proofs of a session in append order.
    pub fn proofs(&self, session_id: &str) -> Vec<ProofEntry> {
        self.proofs
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of sessions with at least one checkpoint.
    pub fn session_count(&self) -> usize {
        self.entries.read().len()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn persist_log_entry(&self, entry: LogEntry) -> Result<(), AuditError> {
        debug!(
            session_id = %entry.session_id,
            message_type = %entry.message_type,
            operation = %entry.operation,
            "[satp] audit"
        );
        self.entries
            .write()
            .entry(entry.session_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn store_proof(&self, proof: ProofEntry) -> Result<(), AuditError> {
        self.proofs
            .write()
            .entry(proof.session_id.clone())
            .or_default()
            .push(proof);
        Ok(())
    }

    async fn latest_entry(&self, session_id: &str) -> Result<Option<LogEntry>, AuditError> {
        Ok(self
            .entries
            .read()
            .get(session_id)
            .and_then(|entries| entries.last().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageType;
    use crate::ports::outbound::LogOperation;

    fn entry(session_id: &str, operation: LogOperation) -> LogEntry {
        LogEntry {
            session_id: session_id.to_string(),
            message_type: MessageType::LockAssert,
            operation,
            data: String::new(),
            sequence_number: 9,
            timestamp: 1,
        }
    }

    #[tokio::test]
    async fn test_entries_are_kept_per_session() {
        let log = InMemoryAuditLog::new();
        log.persist_log_entry(entry("a", LogOperation::Init)).await.unwrap();
        log.persist_log_entry(entry("b", LogOperation::Init)).await.unwrap();
        log.persist_log_entry(entry("a", LogOperation::Exec)).await.unwrap();

        assert_eq!(log.entries("a").len(), 2);
        assert_eq!(log.session_count(), 2);
        assert_eq!(
            log.latest_entry("a").await.unwrap().unwrap().operation,
            LogOperation::Exec
        );
    }

    #[tokio::test]
    async fn test_unknown_session_has_no_entries() {
        let log = InMemoryAuditLog::new();
        assert!(log.latest_entry("missing").await.unwrap().is_none());
        assert!(log.proofs("missing").is_empty());
    }

    #[tokio::test]
    async fn test_proofs_are_appended() {
        let log = InMemoryAuditLog::new();
        log.store_proof(ProofEntry {
            session_id: "a".into(),
            message_type: MessageType::LockAssert,
            operation: "lock".into(),
            data: "proof".into(),
        })
        .await
        .unwrap();

        assert_eq!(log.proofs("a")[0].operation, "lock");
    }
}
