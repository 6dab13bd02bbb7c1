//! Bus configuration with validation.

use crate::{DEFAULT_HISTORY_CAPACITY, DEFAULT_REQUEST_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration for one bus instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Name stamped as `source_service` on every publish
    pub service_name: String,
    /// Maximum number of history entries retained
    pub history_capacity: usize,
    /// Request timeout used when the caller passes none
    #[serde(with = "humantime_serde")]
    pub default_request_timeout: Duration,
    /// Log a warning when a publish has no subscribers
    pub warn_on_no_subscribers: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            service_name: "relay".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            default_request_timeout: DEFAULT_REQUEST_TIMEOUT,
            warn_on_no_subscribers: true,
        }
    }
}

impl BusConfig {
    /// Default configuration for a named service.
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::InvalidServiceName);
        }

        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidHistoryCapacity);
        }

        if self.default_request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "default request timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Empty or whitespace service name
    #[error("service name must not be empty")]
    InvalidServiceName,
    /// Zero history capacity
    #[error("history capacity must be greater than 0")]
    InvalidHistoryCapacity,
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}
