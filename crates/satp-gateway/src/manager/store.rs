//! # Session Store
//!
//! Sessions keyed by id. Each session sits behind its own async mutex so a
//! handler can hold it across bridge calls without blocking other sessions.
//! The map itself is a `parking_lot::RwLock` and is never held across an
//! await point.
//!
//! A second per-session lock, the exchange lock, is held by a client for
//! a whole request/response exchange. The session lock is released while
//! a request is in flight; the exchange lock keeps a second driver of the
//! same session from starting that exchange again.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{SatpError, Session};

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Lock serializing the client exchanges of one session.
pub type ExchangeLock = Arc<Mutex<()>>;

struct Slot {
    transfer_context_id: String,
    session: SessionHandle,
    exchange: ExchangeLock,
}

/// In-memory session store.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Slot>>,
}

impl SessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session; fails if its id is taken.
    pub fn insert(&self, session: Session) -> Result<SessionHandle, SatpError> {
        let id = session.session_id().to_string();
        let transfer_context_id = session.transfer_context_id().to_string();
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&id) {
            return Err(SatpError::SessionMissMatch { session_id: id });
        }
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(
            id,
            Slot {
                transfer_context_id,
                session: handle.clone(),
                exchange: ExchangeLock::default(),
            },
        );
        Ok(handle)
    }

    /// Session by id.
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .get(session_id)
            .map(|slot| slot.session.clone())
    }

    /// Session by id, or `SessionNotFound`.
    pub fn require(&self, session_id: &str) -> Result<SessionHandle, SatpError> {
        self.get(session_id)
            .ok_or_else(|| SatpError::SessionNotFound(session_id.to_string()))
    }

    /// Session and exchange lock by id, or `SessionNotFound`.
    pub fn require_exchange(
        &self,
        session_id: &str,
    ) -> Result<(SessionHandle, ExchangeLock), SatpError> {
        self.sessions
            .read()
            .get(session_id)
            .map(|slot| (slot.session.clone(), slot.exchange.clone()))
            .ok_or_else(|| SatpError::SessionNotFound(session_id.to_string()))
    }

    /// Move a session to a new key. The caller renumbers the session itself.
    pub fn rekey(&self, old_id: &str, new_id: &str) -> Result<(), SatpError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(new_id) {
            return Err(SatpError::SessionMissMatch {
                session_id: new_id.to_string(),
            });
        }
        let slot = sessions
            .remove(old_id)
            .ok_or_else(|| SatpError::SessionNotFound(old_id.to_string()))?;
        sessions.insert(new_id.to_string(), slot);
        Ok(())
    }

    /// Ids and handles of every session for a transfer context.
    pub fn find_by_context(&self, transfer_context_id: &str) -> Vec<(String, SessionHandle)> {
        let mut found: Vec<_> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, slot)| slot.transfer_context_id == transfer_context_id)
            .map(|(id, slot)| (id.clone(), slot.session.clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = SessionStore::new();
        let session = Session::new_client("ctx-1", "v02").unwrap();
        let id = session.session_id().to_string();

        store.insert(session).unwrap();
        assert_eq!(store.len(), 1);
        let handle = store.get(&id).unwrap();
        assert_eq!(handle.lock().await.transfer_context_id(), "ctx-1");
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = SessionStore::new();
        store.insert(Session::new_server("s-1", "ctx-1", "v02").unwrap()).unwrap();

        assert_eq!(
            store
                .insert(Session::new_server("s-1", "ctx-2", "v02").unwrap())
                .unwrap_err(),
            SatpError::SessionMissMatch {
                session_id: "s-1".to_string()
            }
        );
    }

    #[test]
    fn test_rekey_moves_session() {
        let store = SessionStore::new();
        store.insert(Session::new_server("s-1", "ctx-1", "v02").unwrap()).unwrap();
        store.insert(Session::new_server("s-2", "ctx-2", "v02").unwrap()).unwrap();

        assert!(store.rekey("s-1", "s-2").is_err());
        let (_, exchange) = store.require_exchange("s-1").unwrap();
        store.rekey("s-1", "s-3").unwrap();
        assert!(store.get("s-1").is_none());
        assert_eq!(store.len(), 2);
        // the exchange lock travels with the session
        let (_, moved) = store.require_exchange("s-3").unwrap();
        assert!(Arc::ptr_eq(&exchange, &moved));
        let (id, handle) = store.find_by_context("ctx-1").remove(0);
        assert_eq!(id, "s-3");
        // the session keeps its own id until renumbered
        assert_eq!(tokio_test::block_on(handle.lock()).session_id(), "s-1");
    }

    #[tokio::test]
    async fn test_exchange_lock_is_per_session() {
        let store = SessionStore::new();
        store.insert(Session::new_server("s-1", "ctx-1", "v02").unwrap()).unwrap();
        store.insert(Session::new_server("s-2", "ctx-2", "v02").unwrap()).unwrap();

        let (_, first) = store.require_exchange("s-1").unwrap();
        let _turn = first.lock().await;
        let (_, same) = store.require_exchange("s-1").unwrap();
        assert!(same.try_lock().is_err());
        let (_, other) = store.require_exchange("s-2").unwrap();
        assert!(other.try_lock().is_ok());
        assert!(matches!(
            store.require_exchange("missing"),
            Err(SatpError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_find_by_context() {
        let store = SessionStore::new();
        store.insert(Session::new_server("b", "ctx-1", "v02").unwrap()).unwrap();
        store.insert(Session::new_server("a", "ctx-1", "v02").unwrap()).unwrap();
        store.insert(Session::new_server("c", "ctx-2", "v02").unwrap()).unwrap();

        let ids: Vec<_> = store
            .find_by_context("ctx-1")
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert!(store.find_by_context("ctx-9").is_empty());
    }
}
