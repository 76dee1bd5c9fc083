//! # Stage 2: Lock Evidence
//!
//! The client locks the sender asset and sends the signed lock receipt with
//! an absolute expiration. The expiration is fixed the first time it is
//! computed so a rebuilt request carries the same value.

use tracing::info;

use super::common::{asset, carried_claim, BridgeCall};
use super::{ClientSide, ServerSide, Stage2, StageService};
use crate::domain::config::DEFAULT_LOCK_EXPIRATION_MS;
use crate::domain::{now_millis, AssetSide, ClaimKind, MessageType, SatpError, SessionData};
use crate::messages::{LockAssertionReceipt, LockAssertionRequest, TransferCommenceResponse};

impl StageService<Stage2, ClientSide> {
    /// Lock the sender asset and build the lock assertion.
    pub async fn lock_assertion_request(
        &self,
        data: &mut SessionData,
        prior: &TransferCommenceResponse,
    ) -> Result<LockAssertionRequest, SatpError> {
        let message_type = MessageType::LockAssert;
        self.begin(data, message_type).await;

        let sender_asset = asset(data, AssetSide::Sender)?.clone();
        let lock_assertion_expiration = match data.lock_expiration {
            Some(expiration) => expiration,
            None => {
                let lifetime = data
                    .capabilities
                    .as_ref()
                    .map(|c| c.lock_expiration_time)
                    .filter(|t| *t > 0)
                    .unwrap_or(DEFAULT_LOCK_EXPIRATION_MS);
                let expiration = now_millis() + lifetime;
                data.lock_expiration = Some(expiration);
                expiration
            }
        };

        let lock_assertion_claim = self
            .assert_claim(
                data,
                ClaimKind::Lock,
                message_type,
                &sender_asset.network_id,
                BridgeCall::Lock {
                    asset_id: sender_asset.token_id.clone(),
                    amount: sender_asset.amount,
                },
            )
            .await?;

        let request = LockAssertionRequest {
            common: self.request_header(data, message_type, Some(&prior.common))?,
            lock_assertion_claim,
            lock_assertion_format: self.receipt_format(&sender_asset.network_id)?,
            lock_assertion_expiration,
        };
        self.seal(data, request).await
    }

    /// Verify the lock assertion receipt.
    pub async fn check_lock_assertion_receipt(
        &self,
        response: &LockAssertionReceipt,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, response, &[MessageType::AssertionReceipt])
            .await
    }
}

impl StageService<Stage2, ServerSide> {
    /// Verify the lock assertion and record the lock claim.
    pub async fn check_lock_assertion_request(
        &self,
        request: &LockAssertionRequest,
        data: &mut SessionData,
    ) -> Result<(), SatpError> {
        self.check(data, request, &[MessageType::LockAssert])
            .await?;

        let claim = carried_claim(&request.lock_assertion_claim, ClaimKind::Lock)?;
        if request.lock_assertion_expiration <= now_millis() {
            return Err(SatpError::LockExpired(request.lock_assertion_expiration));
        }
        data.claims.set(ClaimKind::Lock, claim);
        data.lock_expiration = Some(request.lock_assertion_expiration);
        info!(
            "[satp] Session {} lock asserted until {}",
            data.id, request.lock_assertion_expiration
        );
        Ok(())
    }

    /// Build the lock assertion receipt.
    pub async fn lock_assertion_receipt(
        &self,
        data: &mut SessionData,
    ) -> Result<LockAssertionReceipt, SatpError> {
        let response = LockAssertionReceipt {
            common: self.response_header(data, MessageType::AssertionReceipt)?,
        };
        self.seal(data, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionState;
    use crate::service::test_support::{pair, Pair};
    use crate::service::{Stage0, Stage1};

    /// Run Stages 0 and 1 and return the commence response.
    async fn commenced(p: &mut Pair) -> TransferCommenceResponse {
        let c0 = StageService::<Stage0, ClientSide>::new(p.client_ctx.clone());
        let s0 = StageService::<Stage0, ServerSide>::new(p.server_ctx.clone());
        let c1 = StageService::<Stage1, ClientSide>::new(p.client_ctx.clone());
        let s1 = StageService::<Stage1, ServerSide>::new(p.server_ctx.clone());
        let (client, server) = (&mut p.client, &mut p.server);

        let m = c0.new_session_request(client).await.unwrap();
        s0.check_new_session_request(&m, server).await.unwrap();
        let r = s0.new_session_response(server).await.unwrap();
        c0.check_new_session_response(&r, client).await.unwrap();
        let m = c0.pre_satp_transfer_request(client, &r).await.unwrap();
        s0.check_pre_satp_transfer_request(&m, server).await.unwrap();
        let r = s0.pre_satp_transfer_response(server).await.unwrap();
        c0.check_pre_satp_transfer_response(&r, client).await.unwrap();

        let m = c1.transfer_proposal_request(client, &r).await.unwrap();
        s1.check_transfer_proposal_request(&m, server).await.unwrap();
        let r = s1.transfer_proposal_response(server).await.unwrap();
        c1.check_transfer_proposal_response(&r, client).await.unwrap();
        let m = c1.transfer_commence_request(client, &r).await.unwrap();
        s1.check_transfer_commence_request(&m, server).await.unwrap();
        let r = s1.transfer_commence_response(server).await.unwrap();
        c1.check_transfer_commence_response(&r, client).await.unwrap();
        r
    }

    #[tokio::test]
    async fn test_lock_assertion_exchange() {
        let mut p = pair();
        let prior = commenced(&mut p).await;
        let client = StageService::<Stage2, ClientSide>::new(p.client_ctx.clone());
        let server = StageService::<Stage2, ServerSide>::new(p.server_ctx.clone());

        let request = client
            .lock_assertion_request(&mut p.client, &prior)
            .await
            .unwrap();
        assert_eq!(request.lock_assertion_format, "mock");
        assert!(request.lock_assertion_expiration > now_millis());
        server
            .check_lock_assertion_request(&request, &mut p.server)
            .await
            .unwrap();
        let receipt = server.lock_assertion_receipt(&mut p.server).await.unwrap();
        client
            .check_lock_assertion_receipt(&receipt, &mut p.client)
            .await
            .unwrap();

        assert!(p.server.claims.has(ClaimKind::Lock));
        assert_eq!(p.server.lock_expiration, p.client.lock_expiration);
        assert_eq!(p.client.last_sequence_number, 10);
        assert_eq!(p.client.state, SessionState::Ongoing);
    }

    #[tokio::test]
    async fn test_rebuilt_lock_request_reuses_claim_and_expiration() {
        let mut p = pair();
        let prior = commenced(&mut p).await;
        let client = StageService::<Stage2, ClientSide>::new(p.client_ctx.clone());

        let first = client
            .lock_assertion_request(&mut p.client, &prior)
            .await
            .unwrap();
        let calls = p.client_bridge.bridge.calls();
        let second = client
            .lock_assertion_request(&mut p.client, &prior)
            .await
            .unwrap();

        assert_eq!(p.client_bridge.bridge.calls(), calls);
        assert_eq!(first.lock_assertion_claim, second.lock_assertion_claim);
        assert_eq!(
            first.lock_assertion_expiration,
            second.lock_assertion_expiration
        );
        assert_eq!(first.common.sequence_number, second.common.sequence_number);
    }

    #[tokio::test]
    async fn test_expired_lock_refused() {
        let mut p = pair();
        let prior = commenced(&mut p).await;
        p.client.lock_expiration = Some(1);
        let client = StageService::<Stage2, ClientSide>::new(p.client_ctx.clone());
        let server = StageService::<Stage2, ServerSide>::new(p.server_ctx.clone());

        let request = client
            .lock_assertion_request(&mut p.client, &prior)
            .await
            .unwrap();
        assert_eq!(
            server
                .check_lock_assertion_request(&request, &mut p.server)
                .await
                .unwrap_err(),
            SatpError::LockExpired(1)
        );
        assert!(!p.server.claims.has(ClaimKind::Lock));
    }

    #[tokio::test]
    async fn test_failed_lock_leaves_no_claim() {
        let mut p = pair();
        let prior = commenced(&mut p).await;
        p.client_bridge.bridge.fail_on(Some("lock"));
        let client = StageService::<Stage2, ClientSide>::new(p.client_ctx.clone());

        assert!(matches!(
            client.lock_assertion_request(&mut p.client, &prior).await,
            Err(SatpError::Bridge { operation: "lock", .. })
        ));
        assert!(!p.client.claims.has(ClaimKind::Lock));
    }
}
