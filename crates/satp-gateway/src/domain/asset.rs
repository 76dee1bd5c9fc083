//! # Assets and Networks
//!
//! Ledger identities and the asset descriptors carried through a transfer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Family of ledger a network runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerType {
    /// Hyperledger Fabric 2.x.
    Fabric2,
    /// Hyperledger Besu 1.x.
    Besu1x,
    /// Hyperledger Besu 2.x.
    Besu2x,
    /// Ethereum.
    Ethereum,
}

/// Identity of a ledger network a gateway can reach.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkId {
    /// Network identifier, unique per gateway deployment.
    pub id: String,
    /// Ledger family.
    pub ledger_type: LedgerType,
}

impl NetworkId {
    /// Create a network identity.
    pub fn new(id: impl Into<String>, ledger_type: LedgerType) -> Self {
        Self {
            id: id.into(),
            ledger_type,
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.id, self.ledger_type)
    }
}

/// Token standard of an asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    /// Ledger-specific fungible token.
    NonstandardFungible,
    /// Ledger-specific non-fungible token.
    NonstandardNonfungible,
    /// ERC-20.
    Erc20,
    /// ERC-721.
    Erc721,
}

/// Asset descriptor on one side of a transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Token identifier on its ledger.
    pub token_id: String,
    /// Token standard.
    pub token_type: TokenType,
    /// Amount moved (1 for non-fungible tokens).
    pub amount: u64,
    /// Current owner on the ledger.
    pub owner: String,
    /// Contract or chaincode name.
    pub contract_name: String,
    /// Contract address, for account-based ledgers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Channel name, for channel-based ledgers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    /// Interaction ontology the bridge uses to drive the contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology: Option<String>,
    /// Network the asset lives on.
    pub network_id: NetworkId,
}

impl Asset {
    /// Create an asset with the mandatory descriptor fields.
    pub fn new(
        token_id: impl Into<String>,
        token_type: TokenType,
        amount: u64,
        owner: impl Into<String>,
        contract_name: impl Into<String>,
        network_id: NetworkId,
    ) -> Self {
        Self {
            token_id: token_id.into(),
            token_type,
            amount,
            owner: owner.into(),
            contract_name: contract_name.into(),
            contract_address: None,
            channel_name: None,
            ontology: None,
            network_id,
        }
    }

    /// Attach a contract address.
    pub fn with_contract_address(mut self, address: impl Into<String>) -> Self {
        self.contract_address = Some(address.into());
        self
    }

    /// Attach a channel name.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel_name = Some(channel.into());
        self
    }

    /// Attach the interaction ontology.
    pub fn with_ontology(mut self, ontology: impl Into<String>) -> Self {
        self.ontology = Some(ontology.into());
        self
    }
}
