//! # Dispatcher
//!
//! The publish path: build the envelope, record it, resolve a pending request
//! the envelope replies to, then fan out to every matching handler and wait
//! for all of them.
//!
//! ```text
//! publish(payload, topic, metadata)
//!     │
//!     ├─► Envelope::new ──────────► Err ─► BusError::Validation
//!     ├─► HistoryBuffer::record
//!     ├─► PendingRequestTable::complete (correlation id present)
//!     ├─► SubscriptionRegistry::find_matching_handlers
//!     └─► spawn one task per handler ─► join all ─► PublishReceipt
//! ```

use crate::config::BusConfig;
use crate::error::BusError;
use crate::handler::HandlerOutcome;
use crate::history::HistoryBuffer;
use crate::pending::PendingRequestTable;
use crate::registry::{SharedHandler, SubscriptionRegistry};
use crate::stats::BusStats;
use futures::future::join_all;
use relay_types::{Envelope, MessageId, Metadata};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of a successful publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    pub message_id: MessageId,
    /// Number of handlers notified (zero is not an error)
    pub subscriber_count: usize,
}

/// Outcome of a batch publish. Best-effort: item failures are counted, never
/// returned as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReceipt {
    pub batch_id: MessageId,
    /// Items submitted
    pub attempted: usize,
    /// Items rejected before dispatch
    pub failed: usize,
    /// Handler notifications across all items
    pub delivered: usize,
}

impl BatchReceipt {
    fn from_results(results: &[Result<PublishReceipt, BusError>]) -> Self {
        let mut receipt = Self {
            batch_id: MessageId::new(),
            attempted: results.len(),
            failed: 0,
            delivered: 0,
        };
        for result in results {
            match result {
                Ok(published) => receipt.delivered += published.subscriber_count,
                Err(_) => receipt.failed += 1,
            }
        }
        receipt
    }
}

/// Per-handler outcomes of one publish, tallied for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub handled: usize,
    pub declined: usize,
    pub failed: usize,
}

impl DispatchReport {
    fn record(&mut self, outcome: &HandlerOutcome) {
        match outcome {
            HandlerOutcome::Handled => self.handled += 1,
            HandlerOutcome::Declined => self.declined += 1,
            HandlerOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Handlers that were invoked, whatever their outcome.
    pub fn notified(&self) -> usize {
        self.handled + self.declined + self.failed
    }
}

/// Whether a publish may complete a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchMode {
    /// Ordinary publish: a correlation id resolves a matching pending request.
    Publish,
    /// The request itself: its correlation id must not resolve its own entry.
    Request,
}

/// Owns the registry, the pending table and the history of one bus.
pub struct Dispatcher<P> {
    service_name: String,
    registry: SubscriptionRegistry<P>,
    pending: PendingRequestTable<P>,
    history: HistoryBuffer<P>,
    stats: BusStats,
    warn_on_no_subscribers: bool,
}

impl<P> Dispatcher<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new(config: &BusConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            registry: SubscriptionRegistry::new(),
            pending: PendingRequestTable::new(),
            history: HistoryBuffer::new(config.history_capacity),
            stats: BusStats::default(),
            warn_on_no_subscribers: config.warn_on_no_subscribers,
        }
    }

    /// Publish one payload.
    pub async fn publish(
        &self,
        payload: P,
        topic: &str,
        metadata: Option<Metadata>,
    ) -> Result<PublishReceipt, BusError> {
        self.dispatch(payload, topic, metadata, DispatchMode::Publish)
            .await
    }

    /// Publish every payload concurrently and wait for all of them.
    pub async fn publish_batch(
        &self,
        payloads: Vec<P>,
        topic: &str,
        metadata: Option<Metadata>,
    ) -> BatchReceipt {
        let publishes = payloads.into_iter().map(|payload| {
            self.dispatch(payload, topic, metadata.clone(), DispatchMode::Publish)
        });
        let receipt = BatchReceipt::from_results(&join_all(publishes).await);

        debug!(
            service = %self.service_name,
            topic = topic,
            batch_id = %receipt.batch_id,
            attempted = receipt.attempted,
            failed = receipt.failed,
            delivered = receipt.delivered,
            "Published batch"
        );

        receipt
    }

    pub(crate) async fn dispatch(
        &self,
        payload: P,
        topic: &str,
        metadata: Option<Metadata>,
        mode: DispatchMode,
    ) -> Result<PublishReceipt, BusError> {
        let metadata = metadata
            .unwrap_or_default()
            .with_source_service(self.service_name.as_str());

        let envelope = match Envelope::new(topic, payload, metadata) {
            Ok(envelope) => Arc::new(envelope),
            Err(err) => {
                self.stats.record_publish_failure();
                error!(
                    service = %self.service_name,
                    topic = topic,
                    error = %err,
                    "Failed to publish"
                );
                return Err(err.into());
            }
        };
        let message_id = envelope.id();

        self.stats.record_published();
        self.history.record(Arc::clone(&envelope));

        debug!(
            service = %self.service_name,
            topic = topic,
            message_id = %message_id,
            correlation_id = ?envelope.metadata().correlation_id,
            "Publishing"
        );

        if mode == DispatchMode::Publish {
            self.resolve_reply(&envelope);
        }

        let handlers = self.registry.find_matching_handlers(topic);
        if handlers.is_empty() {
            if self.warn_on_no_subscribers {
                warn!(service = %self.service_name, topic = topic, "No subscribers for topic");
            } else {
                debug!(service = %self.service_name, topic = topic, "No subscribers for topic");
            }
            return Ok(PublishReceipt {
                message_id,
                subscriber_count: 0,
            });
        }

        let report = self.fan_out(&envelope, handlers).await;
        self.stats.record_dispatch(report.notified(), report.failed);

        info!(
            service = %self.service_name,
            message_id = %message_id,
            topic = topic,
            subscribers = report.notified(),
            handled = report.handled,
            failed = report.failed,
            "Published message"
        );

        Ok(PublishReceipt {
            message_id,
            subscriber_count: report.notified(),
        })
    }

    /// Complete the pending request this envelope replies to, if any.
    ///
    /// Works whatever topic the reply was published on.
    fn resolve_reply(&self, envelope: &Envelope<P>) {
        let Some(correlation_id) = envelope.metadata().reply_correlation_id() else {
            return;
        };

        if self
            .pending
            .complete(correlation_id, envelope.payload().clone())
        {
            self.stats.record_reply_resolved();
            debug!(
                service = %self.service_name,
                correlation_id = %correlation_id,
                "Completed pending request"
            );
        } else {
            // Late reply or plain correlated publish: delivered as a normal message.
            debug!(
                service = %self.service_name,
                correlation_id = %correlation_id,
                topic = envelope.topic(),
                "No pending request for correlation id"
            );
        }
    }

    /// Run every handler on its own task and wait for all of them.
    ///
    /// Handler errors and panics are logged here and go no further.
    async fn fan_out(
        &self,
        envelope: &Arc<Envelope<P>>,
        handlers: Vec<SharedHandler<P>>,
    ) -> DispatchReport {
        let tasks = handlers.into_iter().map(|handler| {
            let envelope = Arc::clone(envelope);
            tokio::spawn(async move { handler.handle(envelope).await })
        });

        let mut report = DispatchReport::default();
        for joined in join_all(tasks).await {
            let outcome = HandlerOutcome::from_join(joined);
            if let HandlerOutcome::Failed(err) = &outcome {
                error!(
                    service = %self.service_name,
                    topic = envelope.topic(),
                    message_id = %envelope.id(),
                    error = %err,
                    "Handler failed"
                );
            }
            report.record(&outcome);
        }
        report
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn registry(&self) -> &SubscriptionRegistry<P> {
        &self.registry
    }

    pub fn pending(&self) -> &PendingRequestTable<P> {
        &self.pending
    }

    pub fn history(&self) -> &HistoryBuffer<P> {
        &self.history
    }

    pub fn stats(&self) -> &BusStats {
        &self.stats
    }
}
