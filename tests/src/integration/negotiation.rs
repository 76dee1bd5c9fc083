//! # Proposal Negotiation
//!
//! Gateway B judges the transfer proposal with its proposal policy; gateway
//! A judges any counter-claims with its counter-claim policy. A rejected
//! transfer never touches the sender's balance.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::harness::*;
    use satp_gateway::domain::{NetworkCapabilities, TransferClaims};
    use satp_gateway::ports::outbound::ProposalDecision;
    use satp_gateway::{
        RejectCounterClaims, SessionState, StandardProposalPolicy, TransferOutcome,
        TransferProgress,
    };

    fn frozen(_: &TransferClaims, _: &NetworkCapabilities) -> ProposalDecision {
        ProposalDecision::Reject("asset frozen".to_string())
    }

    fn reassign_owner(claims: &TransferClaims, _: &NetworkCapabilities) -> ProposalDecision {
        let mut counter = claims.clone();
        counter.receiver_gateway_owner_id = "org-c".to_string();
        ProposalDecision::Counter(counter)
    }

    // =============================================================================
    // REJECTION
    // =============================================================================

    #[tokio::test]
    async fn test_rejected_proposal_ends_transfer() {
        let h = Harness::builder().proposal_policy(Arc::new(frozen)).build();
        let id = h.start();

        let outcome = h.client.manager.transfer(&id, None).await.unwrap();
        assert_eq!(
            outcome,
            TransferOutcome::Rejected {
                session_id: id.clone(),
                reason: "asset frozen".to_string()
            }
        );

        for gateway in [&h.client, &h.server] {
            let status = gateway.manager.status(&id).await.unwrap();
            assert_eq!(status.state, SessionState::Rejected);
            assert_eq!(status.progress, TransferProgress::Rejected);
        }
        let sender = h.client.bridge.asset(SENDER_TOKEN).unwrap();
        assert_eq!((sender.available, sender.locked), (AMOUNT, 0));
    }

    #[tokio::test]
    async fn test_rejected_transfer_stays_rejected() {
        let h = Harness::builder().proposal_policy(Arc::new(frozen)).build();
        let id = h.start();
        h.client.manager.transfer(&id, None).await.unwrap();

        let again = h.client.manager.transfer(&id, None).await.unwrap();
        assert!(matches!(again, TransferOutcome::Rejected { reason, .. } if reason == "asset frozen"));
    }

    #[tokio::test]
    async fn test_profile_outside_allow_list_rejected() {
        let policy = StandardProposalPolicy::new().with_allowed_profiles(["profile-9"]);
        let h = Harness::builder().proposal_policy(Arc::new(policy)).build();
        let id = h.start();

        match h.client.manager.transfer(&id, None).await.unwrap() {
            TransferOutcome::Rejected { reason, .. } => assert!(reason.contains("profile-1")),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    // =============================================================================
    // COUNTER-CLAIMS
    // =============================================================================

    #[tokio::test]
    async fn test_accepted_counter_claims_complete_transfer() {
        let h = Harness::builder()
            .proposal_policy(Arc::new(reassign_owner))
            .build();
        let id = h.start();

        let outcome = h.client.manager.transfer(&id, None).await.unwrap();
        assert_eq!(outcome, TransferOutcome::Completed { session_id: id.clone() });

        let client = h.client.session(&id).await;
        let server = h.server.session(&id).await;
        assert_eq!(client.receiver_gateway_owner_id.as_deref(), Some("org-c"));
        assert_eq!(server.receiver_gateway_owner_id, client.receiver_gateway_owner_id);
        assert_eq!(server.beneficiary, client.beneficiary);
        assert_eq!(server.asset_profile_id, client.asset_profile_id);
        assert_eq!(client.hash_transfer_init_claims, server.hash_transfer_init_claims);
        assert_eq!(server.state, SessionState::Completed);
        assert_eq!(h.server.bridge.asset(RECEIVER_TOKEN).unwrap().owner, "bob");
    }

    #[tokio::test]
    async fn test_refused_counter_claims_reject_on_client() {
        let h = Harness::builder()
            .proposal_policy(Arc::new(reassign_owner))
            .counter_claim_policy(Arc::new(RejectCounterClaims))
            .build();
        let id = h.start();

        let outcome = h.client.manager.transfer(&id, None).await.unwrap();
        assert_eq!(
            outcome,
            TransferOutcome::Rejected {
                session_id: id.clone(),
                reason: "counter-claims refused".to_string()
            }
        );
        assert_eq!(h.client.session(&id).await.state, SessionState::Rejected);
        let sender = h.client.bridge.asset(SENDER_TOKEN).unwrap();
        assert_eq!(sender.locked, 0);
    }
}
