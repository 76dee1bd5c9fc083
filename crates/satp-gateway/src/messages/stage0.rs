//! Stage 0 messages: session establishment and asset wrapping.

use serde::{Deserialize, Serialize};

use super::CommonHeader;
use crate::domain::{AssertionClaim, Asset, NetworkId};

/// Client opens a session with the server gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionRequest {
    /// Header.
    pub common: CommonHeader,
    /// Client gateway identifier, resolved through the directory.
    pub client_gateway_id: String,
    /// Server gateway identifier.
    pub server_gateway_id: String,
    /// Network the asset leaves.
    pub sender_gateway_network_id: NetworkId,
    /// Network the asset arrives on.
    pub recipient_gateway_network_id: NetworkId,
}

/// Server accepts the session; the header carries the session id it uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResponse {
    /// Header.
    pub common: CommonHeader,
    /// Server gateway identifier.
    pub server_gateway_id: String,
}

/// Client presents both asset descriptors and its wrap claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSatpTransferRequest {
    /// Header.
    pub common: CommonHeader,
    /// Asset on the sender ledger.
    pub sender_asset: Asset,
    /// Asset expected on the receiver ledger.
    pub receiver_asset: Asset,
    /// Client's wrap of the sender asset.
    pub wrap_assertion_claim: AssertionClaim,
}

/// Server presents its wrap claim and the receiver token id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSatpTransferResponse {
    /// Header.
    pub common: CommonHeader,
    /// Server's wrap of the receiver asset.
    pub wrap_assertion_claim: AssertionClaim,
    /// Token id the receiver ledger will use.
    pub recipient_token_id: String,
}
