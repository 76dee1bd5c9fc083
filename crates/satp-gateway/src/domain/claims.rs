//! # Claims
//!
//! Signed evidence threaded through the hash chain: bridge assertion claims
//! (wrap, lock, mint, burn, assignment), the Stage 1 transfer claims and the
//! network capabilities a client advertises with its proposal.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::asset::NetworkId;

/// Receipt of a bridge operation, its ledger proof, and the gateway's
/// signature over the receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionClaim {
    /// Opaque receipt returned by the bridge.
    pub receipt: String,
    /// Opaque ledger proof for the receipt.
    pub proof: String,
    /// Hex signature of the issuing gateway over `receipt`.
    pub signature: String,
}

/// Which assertion claim a message carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimKind {
    /// Client wrap of the sender asset.
    SenderWrap,
    /// Server wrap of the receiver asset.
    ReceiverWrap,
    /// Client lock of the sender asset.
    Lock,
    /// Server mint of the receiver asset.
    Mint,
    /// Client burn of the sender asset.
    Burn,
    /// Server assignment of the minted asset to the beneficiary.
    Assignment,
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClaimKind::SenderWrap => "senderWrapAssertionClaim",
            ClaimKind::ReceiverWrap => "receiverWrapAssertionClaim",
            ClaimKind::Lock => "lockAssertionClaim",
            ClaimKind::Mint => "mintAssertionClaim",
            ClaimKind::Burn => "burnAssertionClaim",
            ClaimKind::Assignment => "assignmentAssertionClaim",
        };
        f.write_str(name)
    }
}

/// Assertion claims collected by one side of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    sender_wrap: Option<AssertionClaim>,
    receiver_wrap: Option<AssertionClaim>,
    lock: Option<AssertionClaim>,
    mint: Option<AssertionClaim>,
    burn: Option<AssertionClaim>,
    assignment: Option<AssertionClaim>,
}

impl ClaimSet {
    /// Claim of the given kind, if recorded.
    pub fn get(&self, kind: ClaimKind) -> Option<&AssertionClaim> {
        self.slot(kind).as_ref()
    }

    /// Record a claim, replacing any previous one of the same kind.
    pub fn set(&mut self, kind: ClaimKind, claim: AssertionClaim) {
        *self.slot_mut(kind) = Some(claim);
    }

    /// Whether a claim of the given kind is recorded.
    pub fn has(&self, kind: ClaimKind) -> bool {
        self.get(kind).is_some()
    }

    fn slot(&self, kind: ClaimKind) -> &Option<AssertionClaim> {
        match kind {
            ClaimKind::SenderWrap => &self.sender_wrap,
            ClaimKind::ReceiverWrap => &self.receiver_wrap,
            ClaimKind::Lock => &self.lock,
            ClaimKind::Mint => &self.mint,
            ClaimKind::Burn => &self.burn,
            ClaimKind::Assignment => &self.assignment,
        }
    }

    fn slot_mut(&mut self, kind: ClaimKind) -> &mut Option<AssertionClaim> {
        match kind {
            ClaimKind::SenderWrap => &mut self.sender_wrap,
            ClaimKind::ReceiverWrap => &mut self.receiver_wrap,
            ClaimKind::Lock => &mut self.lock,
            ClaimKind::Mint => &mut self.mint,
            ClaimKind::Burn => &mut self.burn,
            ClaimKind::Assignment => &mut self.assignment,
        }
    }
}

/// Claims a client binds itself to with its transfer proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferClaims {
    /// Asset being transferred.
    pub digital_asset_id: String,
    /// Asset profile governing the asset.
    pub asset_profile_id: String,
    /// Verified originator entity.
    pub verified_originator_entity_id: String,
    /// Verified beneficiary entity.
    pub verified_beneficiary_entity_id: String,
    /// Originator public key.
    pub originator_pubkey: String,
    /// Beneficiary public key.
    pub beneficiary_pubkey: String,
    /// Network the asset leaves.
    pub sender_gateway_network_id: NetworkId,
    /// Network the asset arrives on.
    pub recipient_gateway_network_id: NetworkId,
    /// Client gateway public key.
    pub client_identity_pubkey: String,
    /// Server gateway public key.
    pub server_identity_pubkey: String,
    /// Owner of the sender gateway.
    pub sender_gateway_owner_id: String,
    /// Owner of the receiver gateway.
    pub receiver_gateway_owner_id: String,
}

/// Signature algorithms a gateway may advertise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureAlgorithm {
    /// RSA.
    Rsa,
    /// ECDSA over secp256k1.
    Ecdsa,
}

/// Asset lock mechanisms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockType {
    /// Asset moved to a faucet account.
    Faucet,
    /// Time lock.
    Timelock,
    /// Hash lock.
    Hashlock,
    /// Hash time lock.
    Hashtimelock,
    /// Multi-claim pre-commit.
    Multiclaimpc,
    /// Asset destroyed on lock.
    Destroy,
    /// Asset burned on lock.
    Burn,
}

/// Credential profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialProfile {
    /// SAML assertions.
    Saml,
    /// OAuth tokens.
    Oauth,
    /// X.509 certificates.
    X509,
}

/// Capabilities a client advertises with its proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCapabilities {
    /// Network the client gateway fronts.
    pub sender_gateway_network_id: NetworkId,
    /// Signature algorithm used for protocol messages.
    pub signature_algorithm: SignatureAlgorithm,
    /// Lock mechanism on the sender ledger.
    pub lock_type: LockType,
    /// Lock lifetime in milliseconds.
    pub lock_expiration_time: u64,
    /// Credential profile.
    pub credential_profile: CredentialProfile,
    /// Logging profile.
    pub logging_profile: String,
    /// Access control profile.
    pub access_control_profile: String,
    /// Permission sets, if disclosed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    /// Developer URN, if disclosed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_urn: Option<String>,
    /// Application profile, if disclosed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_profile: Option<String>,
    /// Whether subsequent calls are permitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsequent_calls: Option<bool>,
    /// Prior transfer history references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<String>,
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use crate::domain::LedgerType;

    /// Fully populated claims between a Fabric and a Besu network.
    pub fn claims() -> TransferClaims {
        TransferClaims {
            digital_asset_id: "token-1".to_string(),
            asset_profile_id: "profile-1".to_string(),
            verified_originator_entity_id: "alice".to_string(),
            verified_beneficiary_entity_id: "bob".to_string(),
            originator_pubkey: "02aa".to_string(),
            beneficiary_pubkey: "02bb".to_string(),
            sender_gateway_network_id: NetworkId::new("fabric", LedgerType::Fabric2),
            recipient_gateway_network_id: NetworkId::new("besu", LedgerType::Besu2x),
            client_identity_pubkey: "02cc".to_string(),
            server_identity_pubkey: "02dd".to_string(),
            sender_gateway_owner_id: "org-a".to_string(),
            receiver_gateway_owner_id: "org-b".to_string(),
        }
    }
}
