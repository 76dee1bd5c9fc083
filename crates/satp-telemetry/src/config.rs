//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration for one gateway process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every record
    pub service_name: String,

    /// Gateway identifier, added as a field so two in-process gateways can be told apart
    pub gateway_id: String,

    /// Log level filter (trace, debug, info, warn, error or a full directive)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to include file and line in records
    pub with_source_location: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "satp-gateway".to_string(),
            gateway_id: "gateway".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            with_source_location: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SATP_SERVICE_NAME`: Service name (default: satp-gateway)
    /// - `SATP_GATEWAY_ID`: Gateway identifier (default: gateway)
    /// - `SATP_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `SATP_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `SATP_LOG_SOURCE`: Include file/line (default: false)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("SATP_SERVICE_NAME")
                .unwrap_or_else(|_| "satp-gateway".to_string()),

            gateway_id: env::var("SATP_GATEWAY_ID").unwrap_or_else(|_| "gateway".to_string()),

            log_level: env::var("SATP_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("SATP_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            with_source_location: env::var("SATP_LOG_SOURCE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Configuration for a named gateway, other fields from the environment.
    pub fn for_gateway(gateway_id: &str) -> Self {
        let mut config = Self::from_env();
        config.gateway_id = gateway_id.to_string();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "satp-gateway");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_from_env_reads_overrides() {
        env::set_var("SATP_SERVICE_NAME", "satp-gateway-test");
        env::set_var("SATP_LOG_SOURCE", "1");
        let config = TelemetryConfig::from_env();
        env::remove_var("SATP_SERVICE_NAME");
        env::remove_var("SATP_LOG_SOURCE");

        assert_eq!(config.service_name, "satp-gateway-test");
        assert!(config.with_source_location);
    }

    #[test]
    fn test_for_gateway_overrides_id() {
        let config = TelemetryConfig::for_gateway("gateway-b");
        assert_eq!(config.gateway_id, "gateway-b");
    }
}
