//! # Message Bus
//!
//! The traits collaborators program against and the in-memory implementation.
//!
//! The traits are split by role the way a durable broker would be: a service
//! that only emits messages depends on [`MessagePublisher`], a worker on
//! [`MessageConsumer`], and so on. [`InMemoryMessageBus`] implements all of
//! them for a single process.

use crate::config::{BusConfig, ConfigError};
use crate::dispatcher::{BatchReceipt, Dispatcher, PublishReceipt};
use crate::error::{BusError, HandlerError, RequestError};
use crate::history::HistoryEntry;
use crate::registry::SharedHandler;
use crate::request::RequestCoordinator;
use crate::stats::BusStatsSnapshot;
use crate::topic::is_wildcard;
use async_trait::async_trait;
use relay_types::{Envelope, Metadata};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Publishing side of the bus.
#[async_trait]
pub trait MessagePublisher<P>: Send + Sync {
    /// Publish a payload on a topic.
    ///
    /// Returns once every matching handler has finished. Having no
    /// subscribers is not an error.
    async fn publish(
        &self,
        payload: P,
        topic: &str,
        metadata: Option<Metadata>,
    ) -> Result<PublishReceipt, BusError>;

    /// Publish several payloads on one topic, concurrently.
    ///
    /// Best-effort: item failures are counted in the receipt.
    async fn publish_batch(
        &self,
        payloads: Vec<P>,
        topic: &str,
        metadata: Option<Metadata>,
    ) -> Result<BatchReceipt, BusError>;
}

/// Consuming side of the bus.
#[async_trait]
pub trait MessageConsumer<P>: Send + Sync {
    /// Register a handler for a topic pattern (`*` matches one segment).
    async fn subscribe(&self, pattern: &str, handler: SharedHandler<P>);

    /// Remove every handler registered under exactly `pattern`.
    async fn unsubscribe(&self, pattern: &str) -> bool;
}

/// Request/reply over the bus.
#[async_trait]
pub trait MessageRequester<P>: Send + Sync {
    /// Send a request to `target_service` and wait for the reply.
    ///
    /// `timeout` falls back to the bus default when `None`.
    async fn request(
        &self,
        payload: P,
        target_service: &str,
        request_type: &str,
        timeout: Option<Duration>,
    ) -> Result<P, RequestError>;

    /// As [`MessageRequester::request`], abandoning the wait when `cancel`
    /// fires.
    async fn request_with_cancellation(
        &self,
        payload: P,
        target_service: &str,
        request_type: &str,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Result<P, RequestError>;
}

/// A complete bus: publish, consume, request, plus lifecycle.
#[async_trait]
pub trait MessageBus<P>: MessagePublisher<P> + MessageConsumer<P> + MessageRequester<P> {
    async fn start(&self);

    async fn stop(&self);

    fn is_connected(&self) -> bool;

    fn service_name(&self) -> &str;
}

/// In-process bus. Each instance owns its registry, pending table and
/// history; two instances never see each other's messages.
pub struct InMemoryMessageBus<P> {
    config: BusConfig,
    dispatcher: Arc<Dispatcher<P>>,
    requests: RequestCoordinator,
}

impl<P> InMemoryMessageBus<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Bus with default configuration for `service_name`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::build(BusConfig::for_service(service_name))
    }

    /// Bus with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found by [`BusConfig::validate`].
    pub fn with_config(config: BusConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BusConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(&config)),
            requests: RequestCoordinator::new(config.default_request_timeout),
            config,
        }
    }

    /// Subscribe a closure.
    pub fn subscribe_fn<F, Fut>(&self, pattern: &str, handler: F)
    where
        F: Fn(Arc<Envelope<P>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, HandlerError>> + Send + 'static,
    {
        self.register(pattern, Arc::new(handler));
    }

    fn register(&self, pattern: &str, handler: SharedHandler<P>) {
        self.dispatcher.registry().subscribe(pattern, handler);
        info!(
            service = %self.config.service_name,
            pattern = pattern,
            wildcard = is_wildcard(pattern),
            "Subscribed to topic"
        );
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Shared handle to the dispatcher, for handlers that publish replies.
    pub fn dispatcher(&self) -> Arc<Dispatcher<P>> {
        Arc::clone(&self.dispatcher)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Recorded messages, oldest first.
    pub fn history_snapshot(&self) -> Vec<HistoryEntry<P>> {
        self.dispatcher.history().snapshot()
    }

    /// Drop every subscription.
    pub fn clear_subscribers(&self) {
        self.dispatcher.registry().clear();
        info!(service = %self.config.service_name, "Cleared subscribers");
    }

    /// Drop the recorded history.
    pub fn clear_history(&self) {
        self.dispatcher.history().clear();
        info!(service = %self.config.service_name, "Cleared history");
    }

    /// Number of requests still waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.dispatcher.pending().pending_count()
    }

    pub fn stats(&self) -> BusStatsSnapshot {
        self.dispatcher.stats().snapshot()
    }
}

#[async_trait]
impl<P> MessagePublisher<P> for InMemoryMessageBus<P>
where
    P: Clone + Send + Sync + 'static,
{
    async fn publish(
        &self,
        payload: P,
        topic: &str,
        metadata: Option<Metadata>,
    ) -> Result<PublishReceipt, BusError> {
        self.dispatcher.publish(payload, topic, metadata).await
    }

    async fn publish_batch(
        &self,
        payloads: Vec<P>,
        topic: &str,
        metadata: Option<Metadata>,
    ) -> Result<BatchReceipt, BusError> {
        Ok(self
            .dispatcher
            .publish_batch(payloads, topic, metadata)
            .await)
    }
}

#[async_trait]
impl<P> MessageConsumer<P> for InMemoryMessageBus<P>
where
    P: Clone + Send + Sync + 'static,
{
    async fn subscribe(&self, pattern: &str, handler: SharedHandler<P>) {
        self.register(pattern, handler);
    }

    async fn unsubscribe(&self, pattern: &str) -> bool {
        let removed = self.dispatcher.registry().unsubscribe(pattern);
        info!(
            service = %self.config.service_name,
            pattern = pattern,
            removed = removed,
            "Unsubscribed from topic"
        );
        removed
    }
}

#[async_trait]
impl<P> MessageRequester<P> for InMemoryMessageBus<P>
where
    P: Clone + Send + Sync + 'static,
{
    async fn request(
        &self,
        payload: P,
        target_service: &str,
        request_type: &str,
        timeout: Option<Duration>,
    ) -> Result<P, RequestError> {
        let never = CancellationToken::new();
        self.requests
            .request(
                &self.dispatcher,
                payload,
                target_service,
                request_type,
                timeout,
                &never,
            )
            .await
    }

    async fn request_with_cancellation(
        &self,
        payload: P,
        target_service: &str,
        request_type: &str,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Result<P, RequestError> {
        self.requests
            .request(
                &self.dispatcher,
                payload,
                target_service,
                request_type,
                timeout,
                &cancel,
            )
            .await
    }
}

#[async_trait]
impl<P> MessageBus<P> for InMemoryMessageBus<P>
where
    P: Clone + Send + Sync + 'static,
{
    async fn start(&self) {
        info!(service = %self.config.service_name, "In-memory message bus started");
    }

    async fn stop(&self) {
        info!(service = %self.config.service_name, "In-memory message bus stopped");
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn service_name(&self) -> &str {
        &self.config.service_name
    }
}
