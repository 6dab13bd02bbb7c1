//! # Subscription Registry
//!
//! Maps a topic pattern to the handlers registered under it, in registration
//! order. Backed by a `DashMap`, so subscribes on the same pattern are
//! serialized by the shard lock and never lose an update.

use crate::handler::MessageHandler;
use crate::topic::topic_matches;
use dashmap::DashMap;
use std::sync::Arc;

/// Shared handle to a registered handler.
pub type SharedHandler<P> = Arc<dyn MessageHandler<P>>;

/// Pattern -> handlers map.
pub struct SubscriptionRegistry<P> {
    subscribers: DashMap<String, Vec<SharedHandler<P>>>,
}

impl<P> SubscriptionRegistry<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Append a handler to the pattern's list, creating the list if absent.
    pub fn subscribe(&self, pattern: &str, handler: SharedHandler<P>) {
        self.subscribers
            .entry(pattern.to_owned())
            .or_default()
            .push(handler);
    }

    /// Remove a pattern and all its handlers.
    ///
    /// Returns `false` when the pattern was not registered.
    pub fn unsubscribe(&self, pattern: &str) -> bool {
        self.subscribers.remove(pattern).is_some()
    }

    /// Collect the handlers of every pattern matching `topic`.
    ///
    /// Handlers of one pattern keep registration order; the order across
    /// patterns is unspecified.
    pub fn find_matching_handlers(&self, topic: &str) -> Vec<SharedHandler<P>> {
        let mut handlers = Vec::new();
        for entry in self.subscribers.iter() {
            if topic_matches(entry.key(), topic) {
                handlers.extend(entry.value().iter().cloned());
            }
        }
        handlers
    }

    /// Number of registered patterns.
    pub fn pattern_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of registered handlers across all patterns.
    pub fn handler_count(&self) -> usize {
        self.subscribers.iter().map(|entry| entry.value().len()).sum()
    }

    /// Whether a pattern has at least one handler.
    pub fn contains(&self, pattern: &str) -> bool {
        self.subscribers.contains_key(pattern)
    }

    /// Remove every subscription.
    pub fn clear(&self) {
        self.subscribers.clear();
    }
}

impl<P> Default for SubscriptionRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
