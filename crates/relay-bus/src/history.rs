//! # History Buffer
//!
//! Bounded FIFO log of recently published envelopes, for diagnostics and
//! tests. Once the buffer holds `capacity` entries every new record evicts
//! the oldest one.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_types::Envelope;
use std::collections::VecDeque;
use std::sync::Arc;

/// A recorded publish.
#[derive(Debug)]
pub struct HistoryEntry<P> {
    pub topic: String,
    pub envelope: Arc<Envelope<P>>,
    pub captured_at: DateTime<Utc>,
}

impl<P> Clone for HistoryEntry<P> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            envelope: Arc::clone(&self.envelope),
            captured_at: self.captured_at,
        }
    }
}

/// Bounded, thread-safe publish log.
pub struct HistoryBuffer<P> {
    entries: Mutex<VecDeque<HistoryEntry<P>>>,
    capacity: usize,
}

impl<P> HistoryBuffer<P> {
    /// Create a buffer holding at most `capacity` entries.
    ///
    /// A zero capacity is bumped to one; `BusConfig::validate` rejects it
    /// before it gets here.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            // Grows on demand; `capacity` is only an upper bound.
            entries: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Append an envelope, evicting the oldest entries beyond capacity.
    pub fn record(&self, envelope: Arc<Envelope<P>>) {
        let mut entries = self.entries.lock();
        // Timestamp under the lock: entry order equals timestamp order.
        entries.push_back(HistoryEntry {
            topic: envelope.topic().to_owned(),
            envelope,
            captured_at: Utc::now(),
        });
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Current entries, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry<P>> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
