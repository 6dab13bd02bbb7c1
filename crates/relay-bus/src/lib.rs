//! # Relay Bus - In-Process Message Bus
//!
//! Publish/subscribe with single-segment wildcards, plus request/reply over
//! correlation identifiers, for services sharing one process.
//!
//! ## Message Flow
//!
//! ```text
//! ┌──────────────┐   publish()    ┌──────────────────┐   handle()   ┌──────────────┐
//! │  Publisher   │ ─────────────► │    Dispatcher    │ ───────────► │  Handler(s)  │
//! └──────────────┘                │                  │              └──────┬───────┘
//!                                 │  history         │                     │
//! ┌──────────────┐   request()    │  pending table   │   publish(reply,    │
//! │  Requester   │ ─────────────► │  registry        │ ◄───────────────────┘
//! │              │ ◄───────────── │                  │   correlation id)
//! └──────────────┘     reply      └──────────────────┘
//! ```
//!
//! ## Topics
//!
//! Topics are dot-separated (`orders.created`). A subscription pattern may use
//! `*` for exactly one segment: `orders.*` matches `orders.created` but not
//! `orders` or `orders.created.v2`.
//!
//! ## Guarantees
//!
//! - `publish` returns after every matching handler finished
//! - A failing or panicking handler never affects its siblings or the caller
//! - Every request ends resolved, timed out or cancelled; none leaks

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod history;
pub mod pending;
pub mod registry;
pub mod request;
pub mod stats;
pub mod topic;

use std::time::Duration;

pub use bus::{
    InMemoryMessageBus, MessageBus, MessageConsumer, MessagePublisher, MessageRequester,
};
pub use config::{BusConfig, ConfigError};
pub use dispatcher::{BatchReceipt, DispatchReport, Dispatcher, PublishReceipt};
pub use error::{BusError, HandlerError, RequestError};
pub use handler::{HandlerOutcome, HandlerResult, MessageHandler};
pub use history::{HistoryBuffer, HistoryEntry};
pub use pending::{PendingReply, PendingRequestTable, PendingStats};
pub use registry::{SharedHandler, SubscriptionRegistry};
pub use request::{request_topic, RequestCoordinator};
pub use stats::{BusStats, BusStatsSnapshot};
pub use topic::topic_matches;

pub use relay_types::{headers, CorrelationId, Envelope, Headers, MessageId, Metadata};
pub use tokio_util::sync::CancellationToken;

/// Maximum history entries kept per bus.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Request timeout used when the caller passes none.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
