//! # Message Integrity
//!
//! Requests delivered straight to gateway B's server handler, bypassing
//! gateway A's manager:
//!
//! - a tampered request is refused and closes the session
//! - a byte-identical replay gets the stored answer back
//! - a request for an unknown session is refused without side effects
//! - a session renamed in transit is not adopted by gateway A

#[cfg(test)]
mod tests {
    use crate::harness::*;
    use satp_gateway::messages::{LockAssertionReceipt, LockAssertionRequest, PreSatpTransferRequest};
    use satp_gateway::{
        ManagerError, MessageType, SatpError, SatpServerApi, SessionState, TransferProgress,
        TransferStep,
    };

    /// Transfer stopped right before the pre-transfer request left gateway A.
    async fn held_pre_transfer(h: &Harness) -> (String, PreSatpTransferRequest) {
        let id = h.start();
        h.link.inject(MessageType::PreSatpTransferRequest, Fault::DropRequest);
        h.client.manager.transfer(&id, None).await.unwrap_err();

        let request = h
            .client
            .session(&id)
            .await
            .ledger
            .message(MessageType::PreSatpTransferRequest)
            .cloned()
            .unwrap()
            .into_typed()
            .unwrap();
        (id, request)
    }

    #[tokio::test]
    async fn test_tampered_request_closes_session() {
        let h = Harness::new();
        let (id, mut request) = held_pre_transfer(&h).await;
        request.common.hash_previous_message = "00".repeat(32);

        let refused = h
            .server
            .manager
            .server_handler()
            .pre_satp_transfer(request)
            .await
            .unwrap_err();
        assert_eq!(refused.session_id, id);
        assert_eq!(refused.message_type, MessageType::PreSatpTransferRequest);
        assert_eq!(h.server.session(&id).await.state, SessionState::Error);

        // the genuine request now meets a closed session
        let error = h.client.manager.recover(&id).await.unwrap_err();
        assert!(!error.is_recoverable());
        assert!(matches!(
            error.cause,
            ManagerError::Protocol(SatpError::Rejected { .. })
        ));
        let status = h.client.manager.status(&id).await.unwrap();
        assert_eq!(status.progress, TransferProgress::Failed);
    }

    #[tokio::test]
    async fn test_replayed_request_gets_stored_answer() {
        let h = Harness::new();
        let id = h.start();
        h.client.manager.transfer(&id, None).await.unwrap();
        let server = h.server.session(&id).await;
        let request: LockAssertionRequest = server
            .ledger
            .message(MessageType::LockAssert)
            .cloned()
            .unwrap()
            .into_typed()
            .unwrap();
        let stored: LockAssertionReceipt = server
            .ledger
            .message(MessageType::AssertionReceipt)
            .cloned()
            .unwrap()
            .into_typed()
            .unwrap();

        let replayed = h
            .server
            .manager
            .server_handler()
            .lock_assertion(request)
            .await
            .unwrap();
        assert_eq!(replayed, stored);
        assert_eq!(h.server.session(&id).await, server);
    }

    #[tokio::test]
    async fn test_unknown_session_refused() {
        let h = Harness::new();
        let (id, mut request) = held_pre_transfer(&h).await;
        request.common.session_id = "forged".to_string();

        let refused = h
            .server
            .manager
            .server_handler()
            .pre_satp_transfer(request)
            .await
            .unwrap_err();
        assert_eq!(
            refused.error_code,
            SatpError::SessionNotFound("forged".to_string()).code()
        );
        assert_eq!(h.server.session(&id).await.state, SessionState::Ongoing);
    }

    #[tokio::test]
    async fn test_forged_renumbering_is_not_adopted() {
        let h = Harness::new();
        let id = h.start();
        h.link.forge_session_id("forged-session");

        let error = h.client.manager.transfer(&id, None).await.unwrap_err();
        assert_eq!(error.step, TransferStep::NewSession);
        assert_eq!(error.session_id, id);
        assert!(matches!(
            error.cause,
            ManagerError::Protocol(SatpError::SignatureVerification { .. })
        ));

        let store = h.client.manager.sessions();
        assert!(store.get("forged-session").is_none());
        assert!(store.get(&id).is_some());
        let client = h.client.session(&id).await;
        assert_eq!(client.id, id);
        assert!(!client.ledger.contains(MessageType::NewSessionResponse));
    }
}
