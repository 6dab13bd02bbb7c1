//! Pending Request Table - maps correlation ids to waiting requests.
//!
//! Flow:
//! 1. The coordinator generates a `CorrelationId`
//! 2. It calls `register()` to get a [`PendingReply`] **before** publishing
//! 3. It publishes the request carrying the correlation id
//! 4. A later publish with the same correlation id calls `complete()`
//! 5. The coordinator awaits the reply or gives up (timeout / cancellation)
//!
//! Every terminal path removes the entry. [`PendingReply`] removes it on drop,
//! so an abandoned request future never leaves an orphan behind.

use dashmap::DashMap;
use relay_types::CorrelationId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A request waiting for its reply.
struct PendingRequest<P> {
    /// Registration this entry belongs to
    token: u64,
    /// Channel to send the reply
    sender: oneshot::Sender<P>,
    /// When the request was registered
    created_at: Instant,
    /// Request topic (for logging)
    topic: String,
}

/// Statistics for the pending request table
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Total requests resolved by a reply
    pub total_completed: AtomicU64,
    /// Total requests timed out
    pub total_timeouts: AtomicU64,
    /// Total requests cancelled or abandoned
    pub total_cancelled: AtomicU64,
}

/// Correlation id -> one-shot reply signal.
pub struct PendingRequestTable<P> {
    pending: DashMap<CorrelationId, PendingRequest<P>>,
    next_token: AtomicU64,
    stats: PendingStats,
}

impl<P> PendingRequestTable<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            next_token: AtomicU64::new(0),
            stats: PendingStats::default(),
        }
    }

    /// Register a pending request and get the handle its reply arrives on.
    ///
    /// An id that is already pending is replaced; the displaced request
    /// observes a closed channel and reports cancellation. Dropping the
    /// displaced handle leaves the replacement in place.
    pub fn register(&self, correlation_id: CorrelationId, topic: &str) -> PendingReply<'_, P> {
        let (tx, rx) = oneshot::channel();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        let request = PendingRequest {
            token,
            sender: tx,
            created_at: Instant::now(),
            topic: topic.to_owned(),
        };

        if self
            .pending
            .insert(correlation_id.clone(), request)
            .is_some()
        {
            warn!(
                correlation_id = %correlation_id,
                topic = topic,
                "Replaced an outstanding request with the same correlation id"
            );
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            topic = topic,
            "Registered pending request"
        );

        PendingReply {
            table: self,
            correlation_id,
            token,
            receiver: rx,
        }
    }

    /// Complete a pending request with a reply.
    ///
    /// Returns true if the request was found and the reply delivered; false
    /// if it is unknown, already resolved, or its waiter is gone.
    pub fn complete(&self, correlation_id: &CorrelationId, reply: P) -> bool {
        let Some((_, pending)) = self.pending.remove(correlation_id) else {
            return false;
        };

        let elapsed = pending.created_at.elapsed();
        match pending.sender.send(reply) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    topic = pending.topic,
                    response_time_ms = elapsed.as_millis(),
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                // Receiver was dropped (request abandoned)
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    topic = pending.topic,
                    "Pending request receiver dropped"
                );
                false
            }
        }
    }

    /// Cancel a pending request. Its waiter observes a closed channel.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove a request whose deadline elapsed.
    pub(crate) fn expire(&self, correlation_id: &CorrelationId) -> bool {
        let Some((_, pending)) = self.pending.remove(correlation_id) else {
            return false;
        };
        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        warn!(
            correlation_id = %correlation_id,
            topic = pending.topic,
            elapsed_ms = pending.created_at.elapsed().as_millis(),
            "Removing expired pending request"
        );
        true
    }

    /// Get number of currently pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation id is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl<P> Default for PendingRequestTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one registered request.
///
/// Dropping it removes the entry if it is still in the table.
pub struct PendingReply<'a, P> {
    table: &'a PendingRequestTable<P>,
    correlation_id: CorrelationId,
    token: u64,
    receiver: oneshot::Receiver<P>,
}

impl<P> PendingReply<'_, P> {
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// The reply channel. Resolves with `Err` if the entry was removed
    /// without a reply.
    pub fn receiver(&mut self) -> &mut oneshot::Receiver<P> {
        &mut self.receiver
    }
}

impl<P> Drop for PendingReply<'_, P> {
    fn drop(&mut self) {
        // Only our own registration: the id may have been re-registered.
        let token = self.token;
        if self
            .table
            .pending
            .remove_if(&self.correlation_id, |_, pending| pending.token == token)
            .is_some()
        {
            self.table
                .stats
                .total_cancelled
                .fetch_add(1, Ordering::Relaxed);
            debug!(
                correlation_id = %self.correlation_id,
                "Pending request abandoned"
            );
        }
    }
}
