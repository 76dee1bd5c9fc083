//! Bridge registry.
//!
//! Implements `BridgeManager` as a map from network to bridge.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::NetworkId;
use crate::ports::outbound::{BridgeClient, BridgeManager};

/// Network to bridge map.
#[derive(Default)]
pub struct BridgeRegistry {
    bridges: RwLock<HashMap<NetworkId, Arc<dyn BridgeClient>>>,
}

impl BridgeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the bridge serving `network`.
    pub fn register(&self, network: NetworkId, bridge: Arc<dyn BridgeClient>) {
        info!("[satp] Bridge registered for {}", network);
        self.bridges.write().insert(network, bridge);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_bridge(self, network: NetworkId, bridge: Arc<dyn BridgeClient>) -> Self {
        self.register(network, bridge);
        self
    }
}

impl BridgeManager for BridgeRegistry {
    fn bridge(&self, network: &NetworkId) -> Option<Arc<dyn BridgeClient>> {
        self.bridges.read().get(network).cloned()
    }

    fn networks(&self) -> Vec<NetworkId> {
        let mut networks: Vec<NetworkId> = self.bridges.read().keys().cloned().collect();
        networks.sort_by(|a, b| a.id.cmp(&b.id));
        networks
    }
}
