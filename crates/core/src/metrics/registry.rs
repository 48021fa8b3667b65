//! The metric registry.
//!
//! Records counters, gauges, and histograms as labeled time series with a
//! bounded per-series history, encodes snapshots into the three wire
//! formats, runs pluggable collectors, and fans snapshots out to push
//! targets with per-target failure isolation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use pharos_common::Clock;
use pharos_domain::{
    Labels, MetricDefinition, MetricKind, MetricSample, ObservabilityEvent, WireFormat,
};
use serde_json::Value;
use tracing::{debug, warn};

use super::encode;
use super::{MetricCollector, PushTarget};
use crate::config::ObservabilityConfig;
use crate::ObservabilityBus;

/// Labeled time-series store for counters, gauges, and histograms.
pub struct MetricRegistry {
    clock: Arc<dyn Clock>,
    bus: ObservabilityBus,
    service_name: String,
    max_history: usize,
    push_interval: Duration,
    definitions: RwLock<HashMap<String, MetricDefinition>>,
    samples: RwLock<HashMap<String, VecDeque<MetricSample>>>,
    collectors: RwLock<Vec<Arc<dyn MetricCollector>>>,
    push_targets: RwLock<Vec<PushTarget>>,
}

impl MetricRegistry {
    /// Create a registry from pipeline configuration.
    pub fn new(config: &ObservabilityConfig, clock: Arc<dyn Clock>, bus: ObservabilityBus) -> Self {
        Self {
            clock,
            bus,
            service_name: config.service_name.clone(),
            max_history: config.max_metric_history.max(1),
            push_interval: config.metrics_push_interval,
            definitions: RwLock::new(HashMap::new()),
            samples: RwLock::new(HashMap::new()),
            collectors: RwLock::new(Vec::new()),
            push_targets: RwLock::new(Vec::new()),
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Idempotently upsert a metric definition.
    ///
    /// Registering a histogram also upserts the derived `<name>_count` and
    /// `<name>_sum` counter definitions so those series export alongside
    /// the raw observations.
    pub fn register_metric(&self, def: MetricDefinition) {
        if def.kind == MetricKind::Histogram {
            let count = MetricDefinition {
                name: format!("{}_count", def.name),
                kind: MetricKind::Counter,
                help: format!("Observation count for {}", def.name),
                label_names: def.label_names.clone(),
            };
            let sum = MetricDefinition {
                name: format!("{}_sum", def.name),
                kind: MetricKind::Counter,
                help: format!("Observation sum for {}", def.name),
                label_names: def.label_names.clone(),
            };
            let mut definitions = self.definitions.write();
            definitions.insert(count.name.clone(), count);
            definitions.insert(sum.name.clone(), sum);
            definitions.insert(def.name.clone(), def);
        } else {
            self.definitions.write().insert(def.name.clone(), def);
        }
    }

    /// Register a pluggable collector invoked on every [`collect`] pass.
    ///
    /// [`collect`]: Self::collect
    pub fn add_collector(&self, collector: Arc<dyn MetricCollector>) {
        self.collectors.write().push(collector);
    }

    /// Register a push target. Targets are keyed by name; re-adding a name
    /// replaces the previous target.
    pub fn add_push_target(&self, target: PushTarget) {
        let mut targets = self.push_targets.write();
        targets.retain(|t| t.name != target.name);
        targets.push(target);
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Append a raw sample, evicting the oldest once the per-series history
    /// exceeds the configured maximum.
    pub fn record(&self, name: &str, value: f64, labels: Labels) {
        let sample = MetricSample::new(value, self.clock.now_millis(), labels);
        {
            let mut samples = self.samples.write();
            let series = samples.entry(name.to_string()).or_default();
            series.push_back(sample);
            while series.len() > self.max_history {
                series.pop_front();
            }
        }
        self.bus.publish(ObservabilityEvent::MetricRecorded {
            name: name.to_string(),
            value,
        });
    }

    /// Increment a counter: the latest sample with identical labels plus
    /// `delta` (starting from zero).
    pub fn increment_counter(&self, name: &str, delta: f64, labels: Labels) {
        let latest = self.latest_value(name, &labels).unwrap_or(0.0);
        self.record(name, latest + delta, labels);
    }

    /// Set a gauge to `value` directly.
    pub fn set_gauge(&self, name: &str, value: f64, labels: Labels) {
        self.record(name, value, labels);
    }

    /// Record a histogram observation.
    ///
    /// Stores the raw value tagged `_type=histogram` and maintains the two
    /// derived series: `<name>_count` incremented by one and `<name>_sum`
    /// incremented by `value`, both under the caller's labels.
    pub fn record_histogram(&self, name: &str, value: f64, labels: Labels) {
        let mut tagged = labels.clone();
        tagged.insert("_type".to_string(), "histogram".to_string());
        self.record(name, value, tagged);

        self.increment_counter(&format!("{name}_count"), 1.0, labels.clone());
        self.increment_counter(&format!("{name}_sum"), value, labels);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Latest recorded value for `name` with exactly these labels.
    pub fn latest_value(&self, name: &str, labels: &Labels) -> Option<f64> {
        let samples = self.samples.read();
        samples
            .get(name)
            .and_then(|series| series.iter().rev().find(|s| &s.labels == labels))
            .map(|s| s.value)
    }

    /// All retained samples for `name`, oldest first.
    pub fn samples_for(&self, name: &str) -> Vec<MetricSample> {
        self.samples.read().get(name).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    /// The registered definition for `name`, when any.
    pub fn definition(&self, name: &str) -> Option<MetricDefinition> {
        self.definitions.read().get(name).cloned()
    }

    /// Total number of retained samples across all series.
    pub fn sample_count(&self) -> usize {
        self.samples.read().values().map(VecDeque::len).sum()
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode the current snapshot as Prometheus exposition text.
    ///
    /// Series recorded without a registered definition are silently
    /// skipped.
    pub fn export_prometheus(&self) -> String {
        let (definitions, samples) = self.snapshot();
        encode::prometheus(&definitions, &samples)
    }

    /// Encode the current snapshot in the OpenTelemetry JSON shape.
    pub fn export_opentelemetry(&self) -> Value {
        let (definitions, samples) = self.snapshot();
        encode::opentelemetry(&definitions, &samples)
    }

    /// Encode the current snapshot in the custom JSON envelope.
    pub fn export_json(&self) -> Value {
        let (definitions, samples) = self.snapshot();
        encode::custom_json(&definitions, &samples, &self.service_name, self.push_interval)
    }

    /// Encode the current snapshot in the requested format as a string.
    pub fn export_as(&self, format: WireFormat) -> String {
        match format {
            WireFormat::Prometheus => self.export_prometheus(),
            WireFormat::OpenTelemetry => self.export_opentelemetry().to_string(),
            WireFormat::Json => self.export_json().to_string(),
        }
    }

    /// Definitions sorted by name plus a copy of every defined series.
    fn snapshot(&self) -> (Vec<MetricDefinition>, HashMap<String, Vec<MetricSample>>) {
        let mut definitions: Vec<MetricDefinition> =
            self.definitions.read().values().cloned().collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));

        let samples = self.samples.read();
        let mut snapshot = HashMap::new();
        for def in &definitions {
            if let Some(series) = samples.get(&def.name) {
                snapshot.insert(def.name.clone(), series.iter().cloned().collect());
            }
        }
        (definitions, snapshot)
    }

    // ========================================================================
    // Collection & push
    // ========================================================================

    /// Run every registered collector. A failing collector is reported on
    /// the bus and skipped; the pass always completes.
    pub fn collect(&self) {
        let collectors: Vec<Arc<dyn MetricCollector>> = self.collectors.read().clone();
        for collector in collectors {
            if let Err(error) = collector.collect(self) {
                warn!(collector = collector.name(), %error, "Metric collector failed");
                self.bus.publish(ObservabilityEvent::CollectorFailed {
                    collector: collector.name().to_string(),
                    error: error.to_string(),
                });
            }
        }
    }

    /// Collect, then deliver the appropriate encoding to every push target
    /// concurrently. Target failures are isolated and reported per target;
    /// one failing or slow target never blocks another.
    pub async fn push(&self) {
        self.collect();

        let targets: Vec<PushTarget> = self.push_targets.read().clone();
        if targets.is_empty() {
            return;
        }

        // Encode each needed format once, outside any lock.
        let mut payloads: HashMap<WireFormat, String> = HashMap::new();
        for target in &targets {
            payloads
                .entry(target.format)
                .or_insert_with(|| self.export_as(target.format));
        }
        let payloads = Arc::new(payloads);

        let deliveries = targets.into_iter().map(|target| {
            let payloads = Arc::clone(&payloads);
            async move {
                let payload = payloads.get(&target.format).cloned().unwrap_or_default();
                let outcome =
                    target.sink.deliver(&payload, target.format.content_type()).await;
                (target.name, outcome)
            }
        });

        for (name, outcome) in join_all(deliveries).await {
            match outcome {
                Ok(()) => {
                    debug!(target = %name, "Metric push delivered");
                    self.bus.publish(ObservabilityEvent::PushCompleted {
                        target: name,
                        success: true,
                        error: None,
                    });
                }
                Err(error) => {
                    warn!(target = %name, %error, "Metric push failed");
                    self.bus.publish(ObservabilityEvent::PushCompleted {
                        target: name,
                        success: false,
                        error: Some(error.to_string()),
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("service_name", &self.service_name)
            .field("max_history", &self.max_history)
            .field("definitions", &self.definitions.read().len())
            .field("series", &self.samples.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for metrics::registry.
    use pharos_common::{CommonError, EventBus, MockClock};
    use pharos_domain::labels;

    use super::*;

    fn registry() -> (MetricRegistry, MockClock) {
        let clock = MockClock::new();
        let config = ObservabilityConfig { max_metric_history: 5, ..Default::default() };
        let registry =
            MetricRegistry::new(&config, Arc::new(clock.clone()), EventBus::default());
        (registry, clock)
    }

    #[test]
    fn test_history_bound_evicts_oldest() {
        let (registry, _clock) = registry();
        for i in 0..20 {
            registry.record("m", i as f64, labels(&[]));
        }
        let samples = registry.samples_for("m");
        assert_eq!(samples.len(), 5);
        // Oldest evicted first: the survivors are the last five values.
        assert_eq!(samples[0].value, 15.0);
        assert_eq!(samples[4].value, 19.0);
    }

    #[test]
    fn test_counter_accumulates_per_label_set() {
        let (registry, _clock) = registry();
        registry.increment_counter("requests_total", 1.0, labels(&[("method", "GET")]));
        registry.increment_counter("requests_total", 1.0, labels(&[("method", "GET")]));
        registry.increment_counter("requests_total", 2.5, labels(&[("method", "GET")]));
        registry.increment_counter("requests_total", 1.0, labels(&[("method", "POST")]));

        assert_eq!(
            registry.latest_value("requests_total", &labels(&[("method", "GET")])),
            Some(4.5)
        );
        assert_eq!(
            registry.latest_value("requests_total", &labels(&[("method", "POST")])),
            Some(1.0)
        );
    }

    #[test]
    fn test_gauge_overwrites() {
        let (registry, _clock) = registry();
        registry.set_gauge("queue_depth", 10.0, labels(&[]));
        registry.set_gauge("queue_depth", 3.0, labels(&[]));
        assert_eq!(registry.latest_value("queue_depth", &labels(&[])), Some(3.0));
    }

    #[test]
    fn test_histogram_maintains_derived_series() {
        let (registry, _clock) = registry();
        registry.record_histogram("latency", 0.25, labels(&[("op", "read")]));
        registry.record_histogram("latency", 0.75, labels(&[("op", "read")]));

        assert_eq!(registry.latest_value("latency_count", &labels(&[("op", "read")])), Some(2.0));
        assert_eq!(registry.latest_value("latency_sum", &labels(&[("op", "read")])), Some(1.0));

        // Raw observations carry the _type tag.
        let raw = registry.samples_for("latency");
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].labels.get("_type").map(String::as_str), Some("histogram"));
    }

    #[test]
    fn test_prometheus_export_counts() {
        let (registry, _clock) = registry();
        registry.register_metric(
            MetricDefinition::new("requests_total", MetricKind::Counter, "Total requests")
                .with_labels(&["method"]),
        );
        for _ in 0..3 {
            registry.increment_counter("requests_total", 1.0, labels(&[("method", "GET")]));
        }
        registry.increment_counter("requests_total", 1.0, labels(&[("method", "POST")]));

        let text = registry.export_prometheus();
        assert!(text.contains("# HELP requests_total Total requests"));
        assert!(text.contains("# TYPE requests_total counter"));
        assert!(text.contains("requests_total{method=\"GET\"} 3 "));
        assert!(text.contains("requests_total{method=\"POST\"} 1 "));
    }

    #[test]
    fn test_export_skips_undefined_metrics() {
        let (registry, _clock) = registry();
        registry.record("undefined_series", 1.0, labels(&[]));
        assert!(registry.export_prometheus().is_empty());
    }

    #[test]
    fn test_register_metric_is_idempotent_upsert() {
        let (registry, _clock) = registry();
        registry.register_metric(MetricDefinition::new("m", MetricKind::Gauge, "old help"));
        registry.register_metric(MetricDefinition::new("m", MetricKind::Gauge, "new help"));
        assert_eq!(registry.definition("m").map(|d| d.help), Some("new help".to_string()));
    }

    #[test]
    fn test_histogram_registration_adds_derived_definitions() {
        let (registry, _clock) = registry();
        registry.register_metric(MetricDefinition::new(
            "latency",
            MetricKind::Histogram,
            "Request latency",
        ));
        assert!(registry.definition("latency_count").is_some());
        assert!(registry.definition("latency_sum").is_some());
    }

    #[test]
    fn test_sample_timestamps_come_from_clock() {
        let (registry, clock) = registry();
        let base = clock.now_millis();
        clock.advance_millis(1234);
        registry.record("m", 1.0, labels(&[]));
        assert_eq!(registry.samples_for("m")[0].timestamp_ms, base + 1234);
    }

    struct FailingCollector;

    impl MetricCollector for FailingCollector {
        fn name(&self) -> &str {
            "failing"
        }

        fn collect(&self, _registry: &MetricRegistry) -> pharos_common::CommonResult<()> {
            Err(CommonError::probe("failing", "boom"))
        }
    }

    struct GaugeCollector;

    impl MetricCollector for GaugeCollector {
        fn name(&self) -> &str {
            "gauge"
        }

        fn collect(&self, registry: &MetricRegistry) -> pharos_common::CommonResult<()> {
            registry.set_gauge("collected", 1.0, labels(&[]));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failing_collector_is_isolated() {
        let clock = MockClock::new();
        let bus: ObservabilityBus = EventBus::default();
        let mut rx = bus.subscribe();
        let config = ObservabilityConfig::default();
        let registry = MetricRegistry::new(&config, Arc::new(clock), bus);

        registry.add_collector(Arc::new(FailingCollector));
        registry.add_collector(Arc::new(GaugeCollector));
        registry.collect();

        // The healthy collector still ran.
        assert_eq!(registry.latest_value("collected", &labels(&[])), Some(1.0));

        // And the failure was reported on the bus.
        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if let ObservabilityEvent::CollectorFailed { collector, .. } = event {
                assert_eq!(collector, "failing");
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }
}
