//! Integration tests for the metric registry.
//!
//! Exercises the registry end to end: retention bounds, counter
//! accumulation, histogram invariants, the exposition formats, and push
//! fan-out with per-target isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pharos_common::{CommonError, CommonResult, EventBus, MockClock};
use pharos_core::{DeliverySink, MetricRegistry, ObservabilityBus, ObservabilityConfig, PushTarget};
use pharos_domain::{labels, MetricDefinition, MetricKind, ObservabilityEvent, WireFormat};

/// In-memory sink capturing delivered payloads.
#[derive(Default)]
struct CapturingSink {
    deliveries: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl DeliverySink for CapturingSink {
    async fn deliver(&self, payload: &str, content_type: &str) -> CommonResult<()> {
        self.deliveries.lock().push((payload.to_string(), content_type.to_string()));
        Ok(())
    }
}

/// Sink that always fails.
struct FailingSink {
    calls: AtomicUsize,
}

#[async_trait]
impl DeliverySink for FailingSink {
    async fn deliver(&self, _payload: &str, _content_type: &str) -> CommonResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CommonError::delivery("failing", "connection refused"))
    }
}

fn registry_with(config: ObservabilityConfig) -> (MetricRegistry, ObservabilityBus) {
    let bus: ObservabilityBus = EventBus::default();
    let registry = MetricRegistry::new(&config, Arc::new(MockClock::new()), bus.clone());
    (registry, bus)
}

#[test]
fn retention_never_exceeds_configured_maximum() {
    let (registry, _bus) =
        registry_with(ObservabilityConfig { max_metric_history: 100, ..Default::default() });

    for i in 0..1000 {
        registry.record("hot_series", i as f64, labels(&[("shard", "a")]));
    }
    assert_eq!(registry.samples_for("hot_series").len(), 100);
    assert_eq!(registry.samples_for("hot_series")[0].value, 900.0);
}

#[test]
fn counter_accumulates_sum_of_deltas() {
    let (registry, _bus) = registry_with(ObservabilityConfig::default());
    let deltas = [1.0, 2.0, 0.5, 4.5];
    for delta in deltas {
        registry.increment_counter("work_total", delta, labels(&[("kind", "batch")]));
    }
    assert_eq!(
        registry.latest_value("work_total", &labels(&[("kind", "batch")])),
        Some(deltas.iter().sum::<f64>())
    );
}

#[test]
fn histogram_invariants_hold_after_every_call() {
    let (registry, _bus) = registry_with(ObservabilityConfig::default());
    let observations = [0.1, 0.2, 0.7];
    let mut expected_sum = 0.0;

    for (i, value) in observations.iter().enumerate() {
        registry.record_histogram("op_duration_seconds", *value, labels(&[]));
        expected_sum += value;

        assert_eq!(
            registry.latest_value("op_duration_seconds_count", &labels(&[])),
            Some((i + 1) as f64)
        );
        let sum = registry
            .latest_value("op_duration_seconds_sum", &labels(&[]))
            .expect("sum series present");
        assert!((sum - expected_sum).abs() < 1e-9);
    }
}

#[test]
fn prometheus_export_round_trips_labeled_counters() {
    let (registry, _bus) = registry_with(ObservabilityConfig::default());
    registry.register_metric(
        MetricDefinition::new("requests_total", MetricKind::Counter, "Total requests")
            .with_labels(&["method"]),
    );

    for _ in 0..3 {
        registry.increment_counter("requests_total", 1.0, labels(&[("method", "GET")]));
    }
    registry.increment_counter("requests_total", 1.0, labels(&[("method", "POST")]));

    let text = registry.export_prometheus();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "# HELP requests_total Total requests");
    assert_eq!(lines[1], "# TYPE requests_total counter");
    assert!(lines.iter().any(|l| l.starts_with("requests_total{method=\"GET\"} 3 ")));
    assert!(lines.iter().any(|l| l.starts_with("requests_total{method=\"POST\"} 1 ")));
}

#[test]
fn json_and_otel_exports_carry_the_same_data() {
    let (registry, _bus) = registry_with(ObservabilityConfig::default());
    registry.register_metric(MetricDefinition::new("depth", MetricKind::Gauge, "Queue depth"));
    registry.set_gauge("depth", 4.0, labels(&[("queue", "ingest")]));

    let json = registry.export_json();
    assert_eq!(json["metrics"][0]["name"], "depth");
    assert_eq!(json["metrics"][0]["value"], 4.0);
    assert_eq!(json["metrics"][0]["tags"]["queue"], "ingest");
    assert_eq!(json["metadata"]["source"], "pharos");

    let otel = registry.export_opentelemetry();
    assert_eq!(otel[0]["name"], "depth");
    assert_eq!(otel[0]["dataPoints"][0]["value"], 4.0);
    assert_eq!(otel[0]["dataPoints"][0]["attributes"]["queue"], "ingest");
}

#[tokio::test]
async fn push_isolates_target_failures() {
    let (registry, bus) = registry_with(ObservabilityConfig::default());
    let mut rx = bus.subscribe();

    registry.register_metric(MetricDefinition::new("depth", MetricKind::Gauge, "Queue depth"));
    registry.set_gauge("depth", 1.0, labels(&[]));

    let healthy = Arc::new(CapturingSink::default());
    registry.add_push_target(PushTarget::new("healthy", WireFormat::Prometheus, healthy.clone()));
    registry.add_push_target(PushTarget::new(
        "failing",
        WireFormat::Json,
        Arc::new(FailingSink { calls: AtomicUsize::new(0) }),
    ));

    registry.push().await;

    // The healthy target received a Prometheus payload despite the failure.
    let deliveries = healthy.deliveries.lock();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].0.contains("# TYPE depth gauge"));
    assert_eq!(deliveries[0].1, "text/plain");
    drop(deliveries);

    // Both outcomes were reported per target.
    let mut outcomes = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ObservabilityEvent::PushCompleted { target, success, .. } = event {
            outcomes.push((target, success));
        }
    }
    outcomes.sort();
    assert_eq!(
        outcomes,
        vec![("failing".to_string(), false), ("healthy".to_string(), true)]
    );
}
