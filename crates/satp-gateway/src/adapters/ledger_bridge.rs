//! In-memory ledger bridge.
//!
//! Implements `BridgeClient` over a simulated ledger: wrapped assets with
//! an owner, an available balance and a locked balance. Receipts are JSON
//! documents; proofs are the SHA-256 of the asset's latest receipt.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use shared_crypto::sha256_hex;
use std::collections::HashMap;
use tracing::info;

use crate::domain::{Asset, LedgerType, NetworkId};
use crate::ports::outbound::{BridgeClient, BridgeError};

/// Ledger state of one wrapped asset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrappedAsset {
    /// Current owner.
    pub owner: String,
    /// Spendable balance.
    pub available: u64,
    /// Balance locked for an outgoing transfer.
    pub locked: u64,
    /// Latest receipt issued for the asset.
    pub last_receipt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Receipt<'a> {
    network: &'a str,
    operation: &'static str,
    asset_id: &'a str,
    amount: u64,
    nonce: u64,
}

/// Simulated ledger reachable through the bridge port.
pub struct InMemoryLedgerBridge {
    network: NetworkId,
    assets: RwLock<HashMap<String, WrappedAsset>>,
    nonce: RwLock<u64>,
}

impl InMemoryLedgerBridge {
    /// Empty ledger for `network`.
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            assets: RwLock::new(HashMap::new()),
            nonce: RwLock::new(0),
        }
    }

    /// Seed an asset balance, as if issued natively on the ledger.
    pub fn with_balance(self, asset_id: &str, owner: &str, amount: u64) -> Self {
        self.assets.write().insert(
            asset_id.to_string(),
            WrappedAsset {
                owner: owner.to_string(),
                available: amount,
                ..WrappedAsset::default()
            },
        );
        self
    }

    /// Snapshot of an asset.
    pub fn asset(&self, asset_id: &str) -> Option<WrappedAsset> {
        self.assets.read().get(asset_id).cloned()
    }

    fn issue(&self, operation: &'static str, asset_id: &str, amount: u64) -> Result<String, BridgeError> {
        let nonce = {
            let mut nonce = self.nonce.write();
            *nonce += 1;
            *nonce
        };
        let receipt = serde_json::to_string(&Receipt {
            network: &self.network.id,
            operation,
            asset_id,
            amount,
            nonce,
        })
        .map_err(|e| BridgeError {
            operation,
            reason: e.to_string(),
        })?;
        info!(
            "[satp] {} {} x{} on {}",
            operation, asset_id, amount, self.network
        );
        Ok(receipt)
    }

    fn update<F>(&self, operation: &'static str, asset_id: &str, amount: u64, apply: F) -> Result<String, BridgeError>
    where
        F: FnOnce(&mut WrappedAsset) -> Result<(), String>,
    {
        let mut assets = self.assets.write();
        let asset = assets.get_mut(asset_id).ok_or_else(|| BridgeError {
            operation,
            reason: format!("asset {asset_id} is not wrapped"),
        })?;
        apply(asset).map_err(|reason| BridgeError { operation, reason })?;
        let receipt = self.issue(operation, asset_id, amount)?;
        asset.last_receipt = receipt.clone();
        Ok(receipt)
    }
}

#[async_trait]
impl BridgeClient for InMemoryLedgerBridge {
    fn network_type(&self) -> LedgerType {
        self.network.ledger_type
    }

    fn receipt_format(&self) -> String {
        "application/json".to_string()
    }

    async fn wrap_asset(&self, asset: &Asset) -> Result<String, BridgeError> {
        if asset.network_id != self.network {
            return Err(BridgeError {
                operation: "wrap",
                reason: format!("asset lives on {}, bridge serves {}", asset.network_id, self.network),
            });
        }
        self.assets
            .write()
            .entry(asset.token_id.clone())
            .or_insert_with(|| WrappedAsset {
                owner: asset.owner.clone(),
                ..WrappedAsset::default()
            });
        self.update("wrap", &asset.token_id, asset.amount, |_| Ok(()))
    }

    async fn lock_asset(&self, asset_id: &str, amount: u64) -> Result<String, BridgeError> {
        self.update("lock", asset_id, amount, |asset| {
            if asset.available < amount {
                return Err(format!(
                    "insufficient balance: {} available, {} requested",
                    asset.available, amount
                ));
            }
            asset.available -= amount;
            asset.locked += amount;
            Ok(())
        })
    }

    async fn mint_asset(&self, asset_id: &str, amount: u64) -> Result<String, BridgeError> {
        self.update("mint", asset_id, amount, |asset| {
            asset.available = asset
                .available
                .checked_add(amount)
                .ok_or_else(|| "balance overflow".to_string())?;
            Ok(())
        })
    }

    async fn burn_asset(&self, asset_id: &str, amount: u64) -> Result<String, BridgeError> {
        self.update("burn", asset_id, amount, |asset| {
            if asset.locked < amount {
                return Err(format!(
                    "only {} locked, cannot burn {}",
                    asset.locked, amount
                ));
            }
            asset.locked -= amount;
            Ok(())
        })
    }

    async fn assign_asset(
        &self,
        asset_id: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<String, BridgeError> {
        self.update("assign", asset_id, amount, |asset| {
            if asset.available < amount {
                return Err(format!(
                    "only {} available, cannot assign {}",
                    asset.available, amount
                ));
            }
            asset.owner = recipient.to_string();
            Ok(())
        })
    }

    async fn get_proof(&self, asset_id: &str) -> Result<String, BridgeError> {
        let assets = self.assets.read();
        let asset = assets.get(asset_id).ok_or_else(|| BridgeError {
            operation: "proof",
            reason: format!("asset {asset_id} is not wrapped"),
        })?;
        Ok(sha256_hex(asset.last_receipt.as_bytes()))
    }
}
