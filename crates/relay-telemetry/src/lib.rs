//! # Relay Telemetry
//!
//! Log setup for services built on the Relay message bus.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{init_tracing, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_tracing(&config).expect("Failed to init tracing");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_SERVICE_NAME` | `relay` | Service name in the startup line |
//! | `RELAY_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `RELAY_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `RELAY_JSON_LOGS` | `false` | JSON formatted logs (`true` in containers) |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{init_test_tracing, init_tracing};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}
