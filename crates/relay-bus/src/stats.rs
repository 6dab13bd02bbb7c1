//! Bus counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated on the publish path.
#[derive(Debug, Default)]
pub struct BusStats {
    /// Envelopes successfully constructed and dispatched
    pub messages_published: AtomicU64,
    /// Publishes rejected before dispatch
    pub publish_failures: AtomicU64,
    /// Handler invocations started
    pub handler_invocations: AtomicU64,
    /// Handler invocations that returned an error or panicked
    pub handler_failures: AtomicU64,
    /// Publishes that completed a pending request
    pub replies_resolved: AtomicU64,
}

/// Point-in-time copy of [`BusStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStatsSnapshot {
    pub messages_published: u64,
    pub publish_failures: u64,
    pub handler_invocations: u64,
    pub handler_failures: u64,
    pub replies_resolved: u64,
}

impl BusStats {
    pub fn record_published(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self, invocations: usize, failures: usize) {
        self.handler_invocations
            .fetch_add(invocations as u64, Ordering::Relaxed);
        self.handler_failures
            .fetch_add(failures as u64, Ordering::Relaxed);
    }

    pub fn record_reply_resolved(&self) {
        self.replies_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            messages_published: self.messages_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            handler_invocations: self.handler_invocations.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            replies_resolved: self.replies_resolved.load(Ordering::Relaxed),
        }
    }
}
