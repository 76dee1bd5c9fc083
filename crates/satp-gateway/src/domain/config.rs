//! # Gateway Configuration
//!
//! Identity, connected networks and the capability defaults a gateway
//! advertises in Stage 1.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SATP_GATEWAY_ID` | required | Gateway identifier |
//! | `SATP_GATEWAY_NAME` | gateway id | Display name |
//! | `SATP_RESOURCE_URL` | `satp://<id>` | Resource URL put in message headers |
//! | `SATP_SESSION_TIMEOUT_MS` | `300000` | Idle time before a session is rolled back |

use shared_crypto::GatewayKeyPair;
use thiserror::Error;

use super::asset::NetworkId;
use super::claims::{CredentialProfile, LockType, NetworkCapabilities, SignatureAlgorithm};

/// Protocol version spoken by this implementation.
pub const SATP_VERSION: &str = "v02";

/// Default session timeout (5 minutes).
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 300_000;

/// Default lock lifetime (10 minutes).
pub const DEFAULT_LOCK_EXPIRATION_MS: u64 = 600_000;

/// Gateway configuration.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Gateway identifier, as known to counterparts' directories.
    pub gateway_id: String,
    /// Display name.
    pub name: String,
    /// Protocol version.
    pub version: String,
    /// Resource URL put in message headers.
    pub resource_url: String,
    /// Networks this gateway has bridges for.
    pub connected_networks: Vec<NetworkId>,
    /// Signing identity.
    pub key_pair: GatewayKeyPair,
    /// Legal owner of the gateway.
    pub owner_id: String,

    /// Advertised signature algorithm.
    pub signature_algorithm: SignatureAlgorithm,
    /// Advertised lock mechanism.
    pub lock_type: LockType,
    /// Lock lifetime in milliseconds.
    pub lock_expiration_ms: u64,
    /// Advertised credential profile.
    pub credential_profile: CredentialProfile,
    /// Advertised logging profile.
    pub logging_profile: String,
    /// Advertised access control profile.
    pub access_control_profile: String,
    /// Whether multiple claims are allowed.
    pub multiple_claims_allowed: bool,
    /// Whether multiple cancels are allowed.
    pub multiple_cancels_allowed: bool,

    /// Idle time before a session is considered for rollback.
    pub session_timeout_ms: u64,
}

impl GatewayConfig {
    /// Configuration with defaults for everything but identity.
    pub fn new(gateway_id: impl Into<String>, key_pair: GatewayKeyPair) -> Self {
        let gateway_id = gateway_id.into();
        Self {
            name: gateway_id.clone(),
            resource_url: format!("satp://{gateway_id}"),
            owner_id: gateway_id.clone(),
            gateway_id,
            version: SATP_VERSION.to_string(),
            connected_networks: Vec::new(),
            key_pair,
            signature_algorithm: SignatureAlgorithm::Ecdsa,
            lock_type: LockType::Faucet,
            lock_expiration_ms: DEFAULT_LOCK_EXPIRATION_MS,
            credential_profile: CredentialProfile::X509,
            logging_profile: "default".to_string(),
            access_control_profile: "default".to_string(),
            multiple_claims_allowed: false,
            multiple_cancels_allowed: false,
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
        }
    }

    /// Read identity settings from `SATP_*` environment variables.
    pub fn from_env_with_key(key_pair: GatewayKeyPair) -> Result<Self, ConfigError> {
        Self::from_lookup(key_pair, |name| std::env::var(name).ok())
    }

    fn from_lookup<F>(key_pair: GatewayKeyPair, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gateway_id = lookup("SATP_GATEWAY_ID")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingField("SATP_GATEWAY_ID"))?;
        let mut config = Self::new(gateway_id, key_pair);

        if let Some(name) = lookup("SATP_GATEWAY_NAME") {
            config.name = name;
        }
        if let Some(url) = lookup("SATP_RESOURCE_URL") {
            config.resource_url = url;
        }
        if let Some(timeout) = lookup("SATP_SESSION_TIMEOUT_MS") {
            config.session_timeout_ms =
                timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "SATP_SESSION_TIMEOUT_MS",
                    reason: format!("not a number: {timeout}"),
                })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the resource URL.
    pub fn with_resource_url(mut self, url: impl Into<String>) -> Self {
        self.resource_url = url.into();
        self
    }

    /// Add a connected network.
    pub fn with_network(mut self, network: NetworkId) -> Self {
        if !self.connected_networks.contains(&network) {
            self.connected_networks.push(network);
        }
        self
    }

    /// Set the owner id.
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }

    /// Set the lock mechanism and lifetime.
    pub fn with_lock(mut self, lock_type: LockType, expiration_ms: u64) -> Self {
        self.lock_type = lock_type;
        self.lock_expiration_ms = expiration_ms;
        self
    }

    /// Set the session timeout.
    pub fn with_session_timeout(mut self, timeout_ms: u64) -> Self {
        self.session_timeout_ms = timeout_ms;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway_id.is_empty() {
            return Err(ConfigError::MissingField("gateway_id"));
        }
        if self.version.is_empty() {
            return Err(ConfigError::MissingField("version"));
        }
        if self.resource_url.is_empty() {
            return Err(ConfigError::MissingField("resource_url"));
        }
        if self.lock_expiration_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lock_expiration_ms",
                reason: "cannot be 0".into(),
            });
        }
        if self.session_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session_timeout_ms",
                reason: "cannot be 0".into(),
            });
        }
        if self.signature_algorithm != SignatureAlgorithm::Ecdsa {
            return Err(ConfigError::InvalidValue {
                field: "signature_algorithm",
                reason: "only ECDSA signing is implemented".into(),
            });
        }
        Ok(())
    }

    /// Public key (hex) of the gateway.
    pub fn public_key_hex(&self) -> String {
        self.key_pair.public_key().to_hex()
    }

    /// Whether the gateway serves `network`.
    pub fn supports_network(&self, network: &NetworkId) -> bool {
        self.connected_networks.contains(network)
    }

    /// Capabilities advertised for a transfer leaving `sender_network`.
    pub fn capabilities(&self, sender_network: &NetworkId) -> NetworkCapabilities {
        NetworkCapabilities {
            sender_gateway_network_id: sender_network.clone(),
            signature_algorithm: self.signature_algorithm,
            lock_type: self.lock_type,
            lock_expiration_time: self.lock_expiration_ms,
            credential_profile: self.credential_profile,
            logging_profile: self.logging_profile.clone(),
            access_control_profile: self.access_control_profile.clone(),
            permissions: None,
            developer_urn: None,
            application_profile: None,
            subsequent_calls: None,
            history: Vec::new(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("missing configuration field: {0}")]
    MissingField(&'static str),

    /// A setting has an unusable value
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Setting name
        field: &'static str,
        /// Why it was refused
        reason: String,
    },
}
