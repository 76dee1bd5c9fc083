//! # End-to-End Transfer
//!
//! A complete transfer between gateway A and gateway B over in-memory
//! ledgers:
//!
//! 1. **Assets**: the sender token is locked then burned on `fabric`, the
//!    receiver token minted then assigned on `besu`
//! 2. **Ledgers**: both gateways hold the same 16 messages, hash-chained
//!    and numbered 1 to 16
//! 3. **Audit**: every message leaves checkpoints on both sides
//! 4. **Concurrency**: separate sessions run side by side; two drivers of
//!    one session take turns, so each request leaves gateway A once

#[cfg(test)]
mod tests {
    use crate::harness::*;
    use satp_gateway::ports::outbound::LogOperation;
    use satp_gateway::{
        CrashStatus, MessageType, SatpStage, SessionState, TransferOutcome, TransferProgress,
    };

    // =============================================================================
    // ASSETS
    // =============================================================================

    #[tokio::test]
    async fn test_transfer_moves_asset_between_ledgers() {
        let h = Harness::new();
        let id = h.start();

        let outcome = h.client.manager.transfer(&id, None).await.unwrap();
        assert_eq!(outcome, TransferOutcome::Completed { session_id: id.clone() });

        let sent = h.client.bridge.asset(SENDER_TOKEN).unwrap();
        assert_eq!((sent.available, sent.locked), (0, 0), "sender asset burned");

        let received = h.server.bridge.asset(RECEIVER_TOKEN).unwrap();
        assert_eq!(received.owner, "bob");
        assert_eq!(received.available, AMOUNT);
        assert_eq!(received.locked, 0);
    }

    #[tokio::test]
    async fn test_both_sides_report_completion() {
        let h = Harness::new();
        let id = h.start();
        h.client.manager.transfer(&id, None).await.unwrap();

        for gateway in [&h.client, &h.server] {
            let status = gateway.manager.status(&id).await.unwrap();
            assert_eq!(status.state, SessionState::Completed);
            assert_eq!(status.progress, TransferProgress::Completed);
            assert_eq!(status.stage, Some(SatpStage::Stage3));
        }
        assert_eq!(h.client.manager.resume_point(&id).await.unwrap(), None);
    }

    // =============================================================================
    // LEDGERS
    // =============================================================================

    #[tokio::test]
    async fn test_both_ledgers_hold_the_same_chain() {
        let h = Harness::new();
        let id = h.start();
        h.client.manager.transfer(&id, None).await.unwrap();

        let client = h.client.session(&id).await;
        let server = h.server.session(&id).await;
        assert_eq!(client.ledger.len(), 16);
        assert_eq!(server.ledger.len(), 16);

        for (message_type, entry) in client.ledger.iter() {
            assert_eq!(
                server.ledger.hash(*message_type),
                Some(entry.hash.as_str()),
                "{message_type} stored differently by the server"
            );
            if let Some(previous) = client.expected_previous(*message_type) {
                assert_eq!(
                    Some(entry.message.header().hash_previous_message.as_str()),
                    client.ledger.hash(previous),
                    "{message_type} does not chain onto {previous}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_sequence_numbers_run_one_to_sixteen() {
        let h = Harness::new();
        let id = h.start();
        h.client.manager.transfer(&id, None).await.unwrap();

        let client = h.client.session(&id).await;
        let numbers: Vec<u64> = client
            .ledger
            .iter()
            .map(|(_, entry)| entry.message.header().sequence_number)
            .collect();
        assert_eq!(numbers, (1..=16).collect::<Vec<_>>());
        assert_eq!(client.last_sequence_number, 16);
        assert_eq!(
            client.ledger.last_type(),
            Some(MessageType::CommitTransferCompleteResponse)
        );
    }

    // =============================================================================
    // AUDIT
    // =============================================================================

    #[tokio::test]
    async fn test_audit_trail_ends_done() {
        let h = Harness::new();
        let id = h.start();
        h.client.manager.transfer(&id, None).await.unwrap();

        for audit in [&h.client.audit, &h.server.audit] {
            let entries = audit.entries(&id);
            assert!(!entries.is_empty());
            assert!(entries.iter().all(|e| e.operation != LogOperation::Fail));
            assert_eq!(entries.last().map(|e| e.operation), Some(LogOperation::Done));
        }
        assert_eq!(
            h.client.manager.check_crash(&id).await.unwrap(),
            CrashStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_concurrent_transfers_stay_apart() {
        let h = Harness::builder().sender_balance(2 * AMOUNT).build();
        let first = h.start_in("ctx-1");
        let second = h.start_in("ctx-2");
        assert_ne!(first, second);

        let (a, b) = tokio::join!(
            h.client.manager.transfer(&first, None),
            h.client.manager.transfer(&second, None)
        );
        assert!(matches!(a.unwrap(), TransferOutcome::Completed { .. }));
        assert!(matches!(b.unwrap(), TransferOutcome::Completed { .. }));
        assert_eq!(h.server.manager.sessions().len(), 2);
    }

    #[tokio::test]
    async fn test_two_drivers_of_one_session_take_turns() {
        for _ in 0..20 {
            let h = Harness::new();
            let id = h.start();

            let (a, b) = tokio::join!(
                h.client.manager.transfer(&id, None),
                h.client.manager.transfer(&id, None)
            );
            assert_eq!(a.unwrap(), TransferOutcome::Completed { session_id: id.clone() });
            assert_eq!(b.unwrap(), TransferOutcome::Completed { session_id: id.clone() });

            let mut delivered = h.link.delivered();
            assert_eq!(delivered.len(), 8, "a request was sent twice: {delivered:?}");
            delivered.sort();
            delivered.dedup();
            assert_eq!(delivered.len(), 8);

            let sent = h.client.bridge.asset(SENDER_TOKEN).unwrap();
            assert_eq!((sent.available, sent.locked), (0, 0));
            let received = h.server.bridge.asset(RECEIVER_TOKEN).unwrap();
            assert_eq!(received.available, AMOUNT, "minted more than once");
            assert_eq!(h.client.session(&id).await.ledger.len(), 16);
        }
    }
}
