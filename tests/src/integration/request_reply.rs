//! # Request/Reply Flows
//!
//! A storefront asks a pricing service for quotes. The pricing service is an
//! ordinary subscriber that publishes its answer with the request's
//! correlation id.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    use relay_bus::{
        headers, Dispatcher, Envelope, HandlerError, InMemoryMessageBus, MessageRequester,
        RequestError,
    };

    use crate::integration::{counting_subscriber, ShopMessage};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const UNIT_PRICE_CENTS: u64 = 250;

    /// Pricing service: answers `pricing.GetQuote` on `pricing.quotes`.
    fn spawn_pricing_service(bus: &InMemoryMessageBus<ShopMessage>, delay: Duration) {
        let dispatcher: Arc<Dispatcher<ShopMessage>> = bus.dispatcher();
        bus.subscribe_fn("pricing.GetQuote", move |envelope: Arc<Envelope<ShopMessage>>| {
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                let ShopMessage::QuoteRequest { sku, quantity } = envelope.payload() else {
                    return Ok(false);
                };
                tokio::time::sleep(delay).await;

                let quote = ShopMessage::Quote {
                    sku: sku.clone(),
                    total_cents: UNIT_PRICE_CENTS * u64::from(*quantity),
                };
                dispatcher
                    .publish(quote, "pricing.quotes", Some(envelope.metadata().reply()))
                    .await
                    .map_err(|e| HandlerError::failed(e.to_string()))?;
                Ok::<_, HandlerError>(true)
            }
        });
    }

    fn quote_request(quantity: u32) -> ShopMessage {
        ShopMessage::QuoteRequest {
            sku: "SKU-1".to_string(),
            quantity,
        }
    }

    fn storefront() -> InMemoryMessageBus<ShopMessage> {
        relay_telemetry::init_test_tracing();
        InMemoryMessageBus::new("storefront")
    }

    // =============================================================================
    // RESOLUTION
    // =============================================================================

    #[tokio::test]
    async fn test_quote_round_trip() {
        let bus = storefront();
        spawn_pricing_service(&bus, Duration::ZERO);

        let reply = bus
            .request(quote_request(4), "pricing", "GetQuote", None)
            .await
            .unwrap();

        assert_eq!(
            reply,
            ShopMessage::Quote {
                sku: "SKU-1".to_string(),
                total_cents: 1_000,
            }
        );
        assert_eq!(bus.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_request_carries_query_headers() {
        let bus = storefront();
        let seen = Arc::new(parking_lot::Mutex::new(None));

        let sink = Arc::clone(&seen);
        bus.subscribe_fn("pricing.GetQuote", move |envelope: Arc<Envelope<ShopMessage>>| {
            let sink = Arc::clone(&sink);
            async move {
                let metadata = envelope.metadata();
                *sink.lock() = Some((
                    metadata.header(headers::REQUEST_TYPE).map(str::to_string),
                    metadata.header(headers::RESPONSE_TYPE).map(str::to_string),
                    metadata.correlation_id.is_some(),
                ));
                Ok::<_, HandlerError>(true)
            }
        });

        let err = bus
            .request(
                quote_request(1),
                "pricing",
                "GetQuote",
                Some(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(
            *seen.lock(),
            Some((
                Some("Query".to_string()),
                Some("ShopMessage".to_string()),
                true
            ))
        );
    }

    #[tokio::test]
    async fn test_reply_on_any_topic_resolves_request() {
        let bus = storefront();
        let quotes = counting_subscriber(&bus, "pricing.quotes");
        spawn_pricing_service(&bus, Duration::from_millis(10));

        bus.request(quote_request(2), "pricing", "GetQuote", None)
            .await
            .unwrap();

        // The reply is still delivered to ordinary subscribers of its topic,
        // possibly just after the requester was woken.
        timeout(Duration::from_secs(1), async {
            while quotes.load(std::sync::atomic::Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("reply should reach its topic subscribers");
        assert_eq!(quotes.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(bus.stats().replies_resolved, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_get_their_own_replies() {
        let bus = Arc::new(storefront());
        spawn_pricing_service(&bus, Duration::from_millis(5));

        let requests: Vec<_> = (1..=20u32)
            .map(|quantity| {
                let bus = Arc::clone(&bus);
                tokio::spawn(async move {
                    let reply = bus
                        .request(quote_request(quantity), "pricing", "GetQuote", None)
                        .await
                        .unwrap();
                    (quantity, reply)
                })
            })
            .collect();

        for joined in futures::future::join_all(requests).await {
            let (quantity, reply) = joined.unwrap();
            assert_eq!(
                reply,
                ShopMessage::Quote {
                    sku: "SKU-1".to_string(),
                    total_cents: UNIT_PRICE_CENTS * u64::from(quantity),
                }
            );
        }
        assert_eq!(bus.pending_requests(), 0);
    }

    // =============================================================================
    // FAILURE PATHS
    // =============================================================================

    #[tokio::test]
    async fn test_no_responder_times_out_within_bound() {
        let bus = storefront();

        let err = timeout(
            Duration::from_secs(2),
            bus.request(
                quote_request(1),
                "pricing",
                "GetQuote",
                Some(Duration::from_millis(50)),
            ),
        )
        .await
        .expect("request must end on its own timeout")
        .unwrap_err();

        assert!(matches!(err, RequestError::Timeout { ref topic, .. } if topic == "pricing.GetQuote"));
        assert_eq!(bus.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_slow_responder_misses_deadline() {
        let bus = storefront();
        spawn_pricing_service(&bus, Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = bus
            .request(
                quote_request(1),
                "pricing",
                "GetQuote",
                Some(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_millis(150));
        assert_eq!(bus.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_silent_audit_subscriber_does_not_hold_requester() {
        let bus = storefront();
        spawn_pricing_service(&bus, Duration::ZERO);
        bus.subscribe_fn("pricing.*", |_envelope| async {
            tokio::time::sleep(Duration::from_millis(800)).await;
            Ok::<_, HandlerError>(true)
        });

        // The pricing reply arrives while the audit handler still sleeps.
        let started = std::time::Instant::now();
        let reply = bus
            .request(
                quote_request(3),
                "pricing",
                "GetQuote",
                Some(Duration::from_millis(500)),
            )
            .await
            .unwrap();
        assert_eq!(
            reply,
            ShopMessage::Quote {
                sku: "SKU-1".to_string(),
                total_cents: 750,
            }
        );
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_silent_subscriber_cannot_delay_timeout_or_cancellation() {
        let bus = storefront();
        bus.subscribe_fn("pricing.*", |_envelope| async {
            tokio::time::sleep(Duration::from_millis(800)).await;
            Ok::<_, HandlerError>(true)
        });

        let started = std::time::Instant::now();
        let err = bus
            .request(
                quote_request(1),
                "pricing",
                "GetQuote",
                Some(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_millis(400));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = bus
            .request_with_cancellation(quote_request(1), "pricing", "GetQuote", None, cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(bus.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_ends_wait() {
        let bus = storefront();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = bus
            .request_with_cancellation(quote_request(1), "pricing", "GetQuote", None, cancel)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RequestError::Cancelled {
                topic: "pricing.GetQuote".to_string()
            }
        );
        assert_eq!(bus.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_request_is_cleaned_up() {
        let bus = storefront();

        let abandoned = timeout(
            Duration::from_millis(20),
            bus.request(quote_request(1), "pricing", "GetQuote", None),
        )
        .await;

        assert!(abandoned.is_err());
        assert_eq!(bus.pending_requests(), 0);
    }
}
