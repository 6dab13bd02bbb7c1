//! Error types for the publish, handler and request paths.

use relay_types::EnvelopeError;
use std::time::Duration;
use thiserror::Error;

/// Errors from the publish path.
///
/// Returned to the publisher; the bus never panics on these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The envelope could not be constructed.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl From<EnvelopeError> for BusError {
    fn from(err: EnvelopeError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Errors raised by a subscriber handler.
///
/// The dispatcher logs these and isolates them per handler; they never reach
/// the publisher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler reported a failure.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler task panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Errors surfaced to the caller of a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No reply arrived before the deadline.
    #[error("request to {topic} timed out after {timeout:?}")]
    Timeout { topic: String, timeout: Duration },

    /// The caller cancelled, or the pending entry was cancelled.
    #[error("request to {topic} was cancelled")]
    Cancelled { topic: String },

    /// The request itself could not be published.
    #[error("request could not be published: {0}")]
    Publish(#[from] BusError),
}

impl RequestError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
