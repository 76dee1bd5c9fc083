//! Stage 3 messages: commit preparation, final assertion and completion.

use serde::{Deserialize, Serialize};

use super::CommonHeader;
use crate::domain::AssertionClaim;

/// Client asks the server to prepare the commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPreparationRequest {
    /// Header.
    pub common: CommonHeader,
}

/// Server reports the receiver asset is minted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReadyResponse {
    /// Header.
    pub common: CommonHeader,
    /// Mint claim.
    pub mint_assertion_claim: AssertionClaim,
    /// Receipt format of the claim.
    pub mint_assertion_format: String,
}

/// Client reports the sender asset is burned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitFinalAssertionRequest {
    /// Header.
    pub common: CommonHeader,
    /// Burn claim.
    pub burn_assertion_claim: AssertionClaim,
    /// Receipt format of the claim.
    pub burn_assertion_format: String,
}

/// Server reports the minted asset is assigned to the beneficiary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitFinalAcknowledgementReceipt {
    /// Header.
    pub common: CommonHeader,
    /// Assignment claim.
    pub assignment_assertion_claim: AssertionClaim,
    /// Receipt format of the claim.
    pub assignment_assertion_format: String,
}

/// Client closes the transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCompleteRequest {
    /// Header.
    pub common: CommonHeader,
    /// Stored hash of the transfer commence request.
    pub hash_transfer_commence: String,
}

/// Server confirms completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCompleteResponse {
    /// Header.
    pub common: CommonHeader,
}
