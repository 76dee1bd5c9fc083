//! Static gateway directory.
//!
//! Implements `GatewayDirectory` from entries registered at startup.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ports::outbound::{GatewayDirectory, GatewayTransport};

#[derive(Clone)]
struct Entry {
    public_key: String,
    channel: Option<Arc<dyn GatewayTransport>>,
}

/// Directory of known counterpart gateways.
#[derive(Default)]
pub struct StaticDirectory {
    entries: RwLock<HashMap<String, Entry>>,
}

impl StaticDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway's public key (hex). Keeps any existing channel.
    pub fn register(&self, gateway_id: &str, public_key: &str) {
        let mut entries = self.entries.write();
        let entry = entries.entry(gateway_id.to_string()).or_insert_with(|| Entry {
            public_key: String::new(),
            channel: None,
        });
        entry.public_key = public_key.to_string();
    }

    /// Attach the channel used to reach a registered gateway.
    ///
    /// Returns `false` if the gateway is unknown.
    pub fn connect(&self, gateway_id: &str, channel: Arc<dyn GatewayTransport>) -> bool {
        match self.entries.write().get_mut(gateway_id) {
            Some(entry) => {
                entry.channel = Some(channel);
                true
            }
            None => false,
        }
    }

    /// Number of known gateways.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no gateway is known.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl GatewayDirectory for StaticDirectory {
    fn public_key(&self, gateway_id: &str) -> Option<String> {
        self.entries
            .read()
            .get(gateway_id)
            .map(|e| e.public_key.clone())
    }

    fn channel(&self, gateway_id: &str) -> Option<Arc<dyn GatewayTransport>> {
        self.entries
            .read()
            .get(gateway_id)
            .and_then(|e| e.channel.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let directory = StaticDirectory::new();
        directory.register("gateway-b", "02ab");

        assert_eq!(directory.public_key("gateway-b").as_deref(), Some("02ab"));
        assert!(directory.public_key("gateway-c").is_none());
        assert!(directory.channel("gateway-b").is_none());
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_reregister_replaces_key() {
        let directory = StaticDirectory::new();
        directory.register("gateway-b", "02ab");
        directory.register("gateway-b", "03cd");

        assert_eq!(directory.public_key("gateway-b").as_deref(), Some("03cd"));
        assert!(!directory.is_empty());
    }
}
