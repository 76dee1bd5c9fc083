//! Default negotiation policies.

use crate::domain::{NetworkCapabilities, TransferClaims};
use crate::ports::outbound::{CounterClaimPolicy, ProposalDecision, ProposalPolicy};

/// Server policy accepting any well-formed proposal, optionally restricted
/// to a set of asset profiles.
#[derive(Clone, Debug, Default)]
pub struct StandardProposalPolicy {
    allowed_asset_profiles: Option<Vec<String>>,
}

impl StandardProposalPolicy {
    /// Policy accepting every asset profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept the listed asset profiles.
    pub fn with_allowed_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_asset_profiles = Some(profiles.into_iter().map(Into::into).collect());
        self
    }
}

impl ProposalPolicy for StandardProposalPolicy {
    fn evaluate(
        &self,
        claims: &TransferClaims,
        _capabilities: &NetworkCapabilities,
    ) -> ProposalDecision {
        if claims.digital_asset_id.is_empty() {
            return ProposalDecision::Reject("digital asset id is empty".to_string());
        }
        if claims.originator_pubkey.is_empty() || claims.beneficiary_pubkey.is_empty() {
            return ProposalDecision::Reject("originator and beneficiary keys are required".to_string());
        }
        match &self.allowed_asset_profiles {
            Some(allowed) if !allowed.contains(&claims.asset_profile_id) => {
                ProposalDecision::Reject(format!(
                    "asset profile {} not accepted",
                    claims.asset_profile_id
                ))
            }
            _ => ProposalDecision::Accept,
        }
    }
}

/// Client policy accepting counter-claims that move the same asset between
/// the same networks on behalf of the same originator.
#[derive(Clone, Copy, Debug, Default)]
pub struct SameTransferPolicy;

impl CounterClaimPolicy for SameTransferPolicy {
    fn accept(&self, proposed: &TransferClaims, counter: &TransferClaims) -> bool {
        proposed.digital_asset_id == counter.digital_asset_id
            && proposed.sender_gateway_network_id == counter.sender_gateway_network_id
            && proposed.recipient_gateway_network_id == counter.recipient_gateway_network_id
            && proposed.verified_originator_entity_id == counter.verified_originator_entity_id
    }
}

/// Client policy refusing every counter-claim.
#[derive(Clone, Copy, Debug, Default)]
pub struct RejectCounterClaims;

impl CounterClaimPolicy for RejectCounterClaims {
    fn accept(&self, _proposed: &TransferClaims, _counter: &TransferClaims) -> bool {
        false
    }
}
