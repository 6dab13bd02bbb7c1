//! # Relay Bus Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Topic matching | exact, wildcard and mismatched patterns |
//! | Registry lookup | handlers for one topic among many patterns |
//! | Publish | fan-out to N handlers, join barrier included |
//! | Request/reply | full round trip through a responder |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relay_bus::{
    topic_matches, Envelope, HandlerError, InMemoryMessageBus, MessagePublisher,
    MessageRequester, SharedHandler, SubscriptionRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

// ============================================================================
// Topic Matching
// ============================================================================

fn bench_topic_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("topic-matching");

    let cases = [
        ("exact", "orders.eu.created", "orders.eu.created"),
        ("wildcard", "orders.*.created", "orders.eu.created"),
        ("segment_mismatch", "orders.*", "orders.eu.created"),
        ("literal_mismatch", "payments.*.created", "orders.eu.created"),
    ];

    for (name, pattern, topic) in cases {
        group.bench_function(name, |b| {
            b.iter(|| black_box(topic_matches(black_box(pattern), black_box(topic))))
        });
    }

    group.finish();
}

// ============================================================================
// Registry Lookup
// ============================================================================

fn bench_registry_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry-lookup");

    for patterns in [10usize, 100, 1_000] {
        let registry: SubscriptionRegistry<u64> = SubscriptionRegistry::new();
        for i in 0..patterns {
            let handler: SharedHandler<u64> =
                Arc::new(|_envelope: Arc<Envelope<u64>>| async { Ok::<_, HandlerError>(true) });
            registry.subscribe(&format!("service{i}.*"), handler);
        }

        group.throughput(Throughput::Elements(patterns as u64));
        group.bench_with_input(
            BenchmarkId::new("find_matching_handlers", patterns),
            &registry,
            |b, registry| b.iter(|| black_box(registry.find_matching_handlers("service7.created"))),
        );
    }

    group.finish();
}

// ============================================================================
// Publish Fan-out
// ============================================================================

fn bench_publish_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    group.measurement_time(Duration::from_secs(10));

    let runtime = Runtime::new().expect("tokio runtime");

    for handlers in [1usize, 8, 64] {
        let bus: InMemoryMessageBus<u64> = InMemoryMessageBus::new("bench");
        for _ in 0..handlers {
            bus.subscribe_fn("orders.*", |_envelope| async { Ok::<_, HandlerError>(true) });
        }

        group.throughput(Throughput::Elements(handlers as u64));
        group.bench_with_input(BenchmarkId::new("fan_out", handlers), &bus, |b, bus| {
            b.to_async(&runtime)
                .iter(|| async { black_box(bus.publish(1, "orders.created", None).await) })
        });
    }

    group.finish();
}

// ============================================================================
// Request/Reply
// ============================================================================

fn bench_request_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("request-reply");

    let runtime = Runtime::new().expect("tokio runtime");

    let bus: InMemoryMessageBus<u64> = InMemoryMessageBus::new("bench");
    let dispatcher = bus.dispatcher();
    bus.subscribe_fn("echo.Echo", move |envelope: Arc<Envelope<u64>>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            dispatcher
                .publish(*envelope.payload(), "echo.replies", Some(envelope.metadata().reply()))
                .await
                .map_err(|e| HandlerError::failed(e.to_string()))?;
            Ok::<_, HandlerError>(true)
        }
    });

    group.bench_function("round_trip", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(bus.request(7, "echo", "Echo", None).await) })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_topic_matching,
    bench_registry_lookup,
    bench_publish_fan_out,
    bench_request_round_trip,
);
criterion_main!(benches);
