//! # Request/Reply Coordinator
//!
//! Request/reply layered on publish: the request is published on
//! `"{target_service}.{request_type}"` carrying a fresh correlation id, and
//! the first later publish carrying the same id (on any topic) is the reply.
//!
//! ## Pending request states
//!
//! ```text
//! Created ──► Resolved    (a publish carried the correlation id)
//!    │
//!    ├──────► TimedOut    (deadline elapsed first)
//!    │
//!    └──────► Cancelled   (token fired, entry cancelled, or future dropped)
//! ```
//!
//! The pending entry is registered before the request is published, so a
//! reply sent from inside a handler cannot race ahead of the registration.
//! The deadline starts at registration and covers the request publish
//! itself: a slow subscriber on the request topic cannot stretch it.
//! Cancellation is checked first, so an already-cancelled token always wins.

use crate::dispatcher::{DispatchMode, Dispatcher};
use crate::error::RequestError;
use relay_types::{headers, CorrelationId, Metadata};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Topic a request to `target_service` for `request_type` is published on.
pub fn request_topic(target_service: &str, request_type: &str) -> String {
    format!("{target_service}.{request_type}")
}

/// Issues requests through a [`Dispatcher`] and waits for their replies.
pub struct RequestCoordinator {
    default_timeout: Duration,
}

impl RequestCoordinator {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Publish a request and wait for the reply, the deadline or `cancel`,
    /// whichever comes first. The wait overlaps the request publish.
    ///
    /// # Errors
    ///
    /// - `RequestError::Publish` - the request envelope was rejected
    /// - `RequestError::Timeout` - no reply before the deadline
    /// - `RequestError::Cancelled` - `cancel` fired, or the pending entry was
    ///   cancelled through the table
    pub async fn request<P>(
        &self,
        dispatcher: &Dispatcher<P>,
        payload: P,
        target_service: &str,
        request_type: &str,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<P, RequestError>
    where
        P: Clone + Send + Sync + 'static,
    {
        let correlation_id = CorrelationId::new();
        let topic = request_topic(target_service, request_type);
        let timeout = timeout.unwrap_or(self.default_timeout);

        // Register BEFORE publishing; dropping `reply` removes the entry.
        let mut reply = dispatcher.pending().register(correlation_id.clone(), &topic);

        debug!(
            service = dispatcher.service_name(),
            correlation_id = %correlation_id,
            topic = %topic,
            "Sending request"
        );

        let metadata = Metadata::new()
            .with_correlation_id(correlation_id.clone())
            .with_header(headers::REQUEST_TYPE, headers::QUERY)
            .with_header(headers::RESPONSE_TYPE, short_type_name::<P>());

        let publish =
            dispatcher.dispatch(payload, &topic, Some(metadata), DispatchMode::Request);
        tokio::pin!(publish);
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut published = false;

        // The deadline and the token run while the request's own handlers do.
        // Giving up drops the in-flight publish; spawned handler tasks finish
        // on their own.
        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    dispatcher.pending().cancel(&correlation_id);
                    debug!(
                        service = dispatcher.service_name(),
                        correlation_id = %correlation_id,
                        topic = %topic,
                        published = published,
                        "Request cancelled"
                    );
                    return Err(RequestError::Cancelled { topic: topic.clone() });
                }

                received = reply.receiver() => {
                    return match received {
                        Ok(response) => {
                            debug!(
                                service = dispatcher.service_name(),
                                correlation_id = %correlation_id,
                                "Received response"
                            );
                            Ok(response)
                        }
                        // Sender dropped: the entry was cancelled through the table
                        Err(_) => Err(RequestError::Cancelled { topic: topic.clone() }),
                    };
                }

                result = &mut publish, if !published => {
                    result?;
                    published = true;
                }

                () = &mut deadline => {
                    dispatcher.pending().expire(&correlation_id);
                    warn!(
                        service = dispatcher.service_name(),
                        correlation_id = %correlation_id,
                        topic = %topic,
                        timeout_ms = timeout.as_millis(),
                        published = published,
                        "Request timed out"
                    );
                    return Err(RequestError::Timeout {
                        topic: topic.clone(),
                        timeout,
                    });
                }
            }
        }
    }
}

/// Last path segment of a type name, for the diagnostic response header.
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
