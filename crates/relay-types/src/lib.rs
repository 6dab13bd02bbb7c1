//! # Relay Types
//!
//! Data model shared by the bus and its collaborators.
//!
//! - [`Envelope`]: immutable wrapper created once per publish
//! - [`Metadata`]: correlation id, source service and string headers
//! - [`MessageId`] / [`CorrelationId`]: identifiers
//!
//! Nothing here is serialized across a process boundary; serde derives exist
//! for diagnostics dumps and test fixtures.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod envelope;
pub mod ids;
pub mod metadata;

pub use envelope::{Envelope, EnvelopeError};
pub use ids::{CorrelationId, MessageId};
pub use metadata::{headers, Headers, Metadata};
