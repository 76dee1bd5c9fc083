//! # SATP Telemetry
//!
//! Structured logging for gateway processes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use satp_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::for_gateway("gateway-a");
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SATP_SERVICE_NAME` | `satp-gateway` | Service name |
//! | `SATP_GATEWAY_ID` | `gateway` | Gateway identifier |
//! | `SATP_LOG_LEVEL` | `info` | Log level filter |
//! | `SATP_JSON_LOGS` | `false` | JSON output |

#![warn(missing_docs)]

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{init_test_tracing, init_tracing};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The log level directive could not be parsed
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber is already installed
    #[error("Tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Initialize logging for a gateway process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_tracing(config)?;
    tracing::info!(gateway_id = %config.gateway_id, "[satp] Telemetry initialized");
    Ok(())
}

/// Log a protocol event with the session and message type attached as fields.
#[macro_export]
macro_rules! session_event {
    ($level:ident, $session_id:expr, $message_type:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            session_id = %$session_id,
            message_type = %$message_type,
            $($($field)*,)?
            $msg
        )
    };
}
