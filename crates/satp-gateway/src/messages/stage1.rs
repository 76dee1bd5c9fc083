//! Stage 1 messages: transfer proposal and commence.

use serde::{Deserialize, Serialize};

use super::CommonHeader;
use crate::domain::{NetworkCapabilities, TransferClaims};

/// Client proposes the transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProposalRequest {
    /// Header.
    pub common: CommonHeader,
    /// Claims the client binds itself to.
    pub transfer_init_claims: TransferClaims,
    /// Capabilities of the sender network.
    pub network_capabilities: NetworkCapabilities,
    /// Whether multiple claims are allowed.
    pub multiple_claims_allowed: bool,
    /// Whether multiple cancels are allowed.
    pub multiple_cancels_allowed: bool,
}

/// Server answer to a proposal: `INIT_RECEIPT` or `INIT_REJECT`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProposalReceipt {
    /// Header.
    pub common: CommonHeader,
    /// Hash of the claims being answered.
    pub hash_transfer_init_claims: String,
    /// Counter-proposal attached to a reject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_counter_claims: Option<TransferClaims>,
    /// Reason for a reject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

/// Client commits to the agreed claims.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCommenceRequest {
    /// Header.
    pub common: CommonHeader,
    /// Hash of the agreed claims.
    pub hash_transfer_init_claims: String,
}

/// Server acknowledges commence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCommenceResponse {
    /// Header.
    pub common: CommonHeader,
}
