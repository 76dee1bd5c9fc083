//! Stage 2 messages: lock assertion.

use serde::{Deserialize, Serialize};

use super::CommonHeader;
use crate::domain::AssertionClaim;

/// Client asserts the sender asset is locked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockAssertionRequest {
    /// Header.
    pub common: CommonHeader,
    /// Lock claim.
    pub lock_assertion_claim: AssertionClaim,
    /// Receipt format of the claim.
    pub lock_assertion_format: String,
    /// Lock expiry (unix millis).
    pub lock_assertion_expiration: u64,
}

/// Server receipt for the lock assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockAssertionReceipt {
    /// Header.
    pub common: CommonHeader,
}
