//! # Crash Recovery
//!
//! Interrupted exchanges between gateway A and gateway B:
//!
//! 1. **Lost request**: the server never saw it; resending completes
//! 2. **Lost response**: the server already acted; the resent request is
//!    byte-identical, so the server answers from its ledger and no ledger
//!    operation runs twice
//! 3. **Process crash**: gateway A stops mid-step; resuming rebuilds the
//!    same request it would have sent
//! 4. **Assessment**: the audit trail shows the interrupted step

#[cfg(test)]
mod tests {
    use crate::harness::*;
    use satp_gateway::ports::outbound::LogOperation;
    use satp_gateway::{
        ClientHandler, CrashStatus, ManagerError, MessageType, SatpError, SessionState,
        TransferOutcome, TransferProgress, TransferStep,
    };

    // =============================================================================
    // LOST REQUEST
    // =============================================================================

    #[tokio::test]
    async fn test_lost_request_is_resent() {
        let h = Harness::new();
        let id = h.start();
        h.link.inject(MessageType::CommitPrepare, Fault::DropRequest);

        let error = h.client.manager.transfer(&id, None).await.unwrap_err();
        assert_eq!(error.step, TransferStep::CommitPreparation);
        assert!(error.is_recoverable());
        assert!(matches!(error.cause, ManagerError::RetrieveSatpMessage { .. }));

        let outcome = h
            .client
            .manager
            .transfer(&id, Some(error.resume_from()))
            .await
            .unwrap();
        assert_eq!(outcome, TransferOutcome::Completed { session_id: id });
        assert_eq!(
            h.server.bridge.asset(RECEIVER_TOKEN).unwrap().available,
            AMOUNT
        );
    }

    #[tokio::test]
    async fn test_interrupted_session_is_in_recovery() {
        let h = Harness::new();
        let id = h.start();
        h.link.inject(MessageType::CommitPrepare, Fault::DropRequest);
        h.client.manager.transfer(&id, None).await.unwrap_err();

        assert_eq!(
            h.client.manager.check_crash(&id).await.unwrap(),
            CrashStatus::InRecovery
        );
        assert_eq!(
            h.client.manager.resume_point(&id).await.unwrap(),
            Some(MessageType::CommitPrepare)
        );
        let status = h.client.manager.status(&id).await.unwrap();
        assert_eq!(status.state, SessionState::Ongoing);
        assert_eq!(status.progress, TransferProgress::Stage3InProgress);
        assert_eq!(
            h.client.audit.entries(&id).last().map(|e| e.operation),
            Some(LogOperation::Fail)
        );
    }

    // =============================================================================
    // LOST RESPONSE
    // =============================================================================

    #[tokio::test]
    async fn test_lost_commit_ready_does_not_mint_twice() {
        let h = Harness::new();
        let id = h.start();
        h.link.inject(MessageType::CommitPrepare, Fault::DropResponse);

        h.client.manager.transfer(&id, None).await.unwrap_err();
        assert_eq!(
            h.server.bridge.asset(RECEIVER_TOKEN).unwrap().available,
            AMOUNT,
            "minted before the response was lost"
        );

        let outcome = h.client.manager.recover(&id).await.unwrap();
        assert!(matches!(outcome, TransferOutcome::Completed { .. }));
        let received = h.server.bridge.asset(RECEIVER_TOKEN).unwrap();
        assert_eq!(received.available, AMOUNT);
        assert_eq!(received.owner, "bob");
        assert_eq!(
            h.link
                .delivered()
                .iter()
                .filter(|t| **t == MessageType::CommitPrepare)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_lost_lock_receipt_does_not_lock_twice() {
        let h = Harness::new();
        let id = h.start();
        h.link.inject(MessageType::LockAssert, Fault::DropResponse);

        let error = h.client.manager.transfer(&id, None).await.unwrap_err();
        assert_eq!(error.step, TransferStep::LockAssertion);
        assert_eq!(h.client.bridge.asset(SENDER_TOKEN).unwrap().locked, AMOUNT);

        let outcome = h.client.manager.recover(&id).await.unwrap();
        assert!(matches!(outcome, TransferOutcome::Completed { .. }));
        let sender = h.client.bridge.asset(SENDER_TOKEN).unwrap();
        assert_eq!((sender.available, sender.locked), (0, 0));
    }

    #[tokio::test]
    async fn test_lost_new_session_response_is_replayed() {
        let h = Harness::new();
        let id = h.start();
        h.link.inject(MessageType::NewSessionRequest, Fault::DropResponse);

        h.client.manager.transfer(&id, None).await.unwrap_err();
        assert_eq!(h.server.manager.sessions().len(), 1);

        let outcome = h.client.manager.recover(&id).await.unwrap();
        assert_eq!(outcome.session_id(), id);
        assert_eq!(h.server.manager.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_from_earlier_step_skips_answered_exchanges() {
        let h = Harness::new();
        let id = h.start();
        h.link.inject(MessageType::CommitFinal, Fault::DropRequest);
        h.client.manager.transfer(&id, None).await.unwrap_err();
        let before = h.link.delivered().len();

        let outcome = h
            .client
            .manager
            .transfer(&id, Some(MessageType::InitProposal))
            .await
            .unwrap();
        assert!(matches!(outcome, TransferOutcome::Completed { .. }));
        assert_eq!(
            h.link.delivered()[before..],
            [MessageType::CommitFinal, MessageType::CommitTransferComplete]
        );
    }

    // =============================================================================
    // PROCESS CRASH
    // =============================================================================

    #[tokio::test]
    async fn test_crash_before_commit_prepare_resends_identical_request() {
        let h = Harness::new();
        let id = h.start();
        h.crash.crash_at(MessageType::CommitPrepare, LogOperation::Init);

        // dropping the driver stands in for the dead process
        tokio::select! {
            _ = h.client.manager.transfer(&id, None) => panic!("transfer outlived the crash"),
            _ = h.crash.crashed() => {}
        }
        assert!(!h.link.delivered().contains(&MessageType::CommitPrepare));
        assert_eq!(
            h.client.manager.check_crash(&id).await.unwrap(),
            CrashStatus::InRecovery
        );
        assert_eq!(
            h.client.manager.resume_point(&id).await.unwrap(),
            Some(MessageType::AssertionReceipt)
        );

        let mut snapshot = h.client.session(&id).await;
        let prior = snapshot
            .ledger
            .message(MessageType::AssertionReceipt)
            .cloned();
        let expected = ClientHandler::new(h.client.ctx.clone())
            .build_request(TransferStep::CommitPreparation, &mut snapshot, prior.as_ref())
            .await
            .unwrap();

        let outcome = h
            .client
            .manager
            .transfer(&id, Some(MessageType::CommitPrepare))
            .await
            .unwrap();
        assert_eq!(outcome, TransferOutcome::Completed { session_id: id.clone() });

        let sent = h
            .server
            .session(&id)
            .await
            .ledger
            .message(MessageType::CommitPrepare)
            .cloned()
            .unwrap();
        assert_eq!(sent.header().sequence_number, 11);
        assert_eq!(
            sent.canonical_bytes().unwrap(),
            expected.canonical_bytes().unwrap()
        );
        assert_eq!(
            h.server.bridge.asset(RECEIVER_TOKEN).unwrap().available,
            AMOUNT
        );
    }

    // =============================================================================
    // ASSESSMENT
    // =============================================================================

    #[tokio::test]
    async fn test_unknown_session_cannot_be_assessed() {
        let h = Harness::new();

        let error = h.client.manager.check_crash("missing").await.unwrap_err();
        assert_eq!(
            error,
            ManagerError::Protocol(SatpError::SessionNotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fresh_session_is_idle() {
        let h = Harness::new();
        let id = h.start();

        assert_eq!(
            h.client.manager.check_crash(&id).await.unwrap(),
            CrashStatus::Idle
        );
        assert_eq!(h.client.manager.resume_point(&id).await.unwrap(), None);
    }
}
