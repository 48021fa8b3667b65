//! The telemetry exporter.
//!
//! Batches current metric/debug/diagnostic state on a fixed interval and
//! delivers it to registered destinations with bounded retry. Destination
//! failures are isolated: exhausting retries emits an `exportError` event
//! and counts a failure, and the exporter keeps running.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use pharos_common::{
    retry_with_config, Clock, CommonError, CommonResult, RetryConfig, Ticker, TickerHandle,
};
use pharos_core::{
    DeliverySink, HealthEngine, MetricRegistry, ObservabilityBus, ObservabilityConfig,
    TraceRecorder,
};
use pharos_domain::{ExportResult, ExporterStats, ObservabilityEvent, WireFormat};
use serde_json::json;
use tracing::{debug, warn};

/// Debug events included in each JSON batch.
const BATCH_EVENT_COUNT: usize = 100;

/// One registered export destination.
#[derive(Clone)]
pub struct ExportDestination {
    /// Unique destination name.
    pub name: String,
    /// Encoding this destination expects.
    pub format: WireFormat,
    /// Transport used to deliver the batch.
    pub sink: Arc<dyn DeliverySink>,
}

impl ExportDestination {
    /// Create a destination.
    pub fn new(name: impl Into<String>, format: WireFormat, sink: Arc<dyn DeliverySink>) -> Self {
        Self { name: name.into(), format, sink }
    }
}

impl std::fmt::Debug for ExportDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportDestination")
            .field("name", &self.name)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Batches observability state and ships it to destinations with retry.
pub struct TelemetryExporter {
    clock: Arc<dyn Clock>,
    bus: ObservabilityBus,
    registry: Arc<MetricRegistry>,
    recorder: Arc<TraceRecorder>,
    health: Arc<HealthEngine>,
    retry: RetryConfig,
    export_interval: Duration,
    destinations: RwLock<HashMap<String, ExportDestination>>,
    ticker: Mutex<Option<TickerHandle>>,
    total_exports: AtomicU64,
    successful_exports: AtomicU64,
    failed_exports: AtomicU64,
    last_export_at_ms: AtomicU64,
}

impl TelemetryExporter {
    /// Create an exporter over the three stateful components.
    pub fn new(
        config: &ObservabilityConfig,
        clock: Arc<dyn Clock>,
        bus: ObservabilityBus,
        registry: Arc<MetricRegistry>,
        recorder: Arc<TraceRecorder>,
        health: Arc<HealthEngine>,
    ) -> Self {
        Self {
            clock,
            bus,
            registry,
            recorder,
            health,
            retry: RetryConfig::exponential(
                config.max_retry_attempts,
                config.retry_initial_backoff,
            ),
            export_interval: config.export_interval,
            destinations: RwLock::new(HashMap::new()),
            ticker: Mutex::new(None),
            total_exports: AtomicU64::new(0),
            successful_exports: AtomicU64::new(0),
            failed_exports: AtomicU64::new(0),
            last_export_at_ms: AtomicU64::new(0),
        }
    }

    // ========================================================================
    // Destinations
    // ========================================================================

    /// Register a destination. Re-adding a name replaces the previous one.
    pub fn add_destination(&self, destination: ExportDestination) {
        self.destinations.write().insert(destination.name.clone(), destination);
    }

    /// Remove a destination. Returns whether it existed.
    pub fn remove_destination(&self, name: &str) -> bool {
        self.destinations.write().remove(name).is_some()
    }

    /// Number of registered destinations.
    pub fn destination_count(&self) -> usize {
        self.destinations.read().len()
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Start the batch-export ticker. A second call while running is a
    /// no-op; a zero export interval disables the schedule entirely.
    pub fn start_batch_export(self: &Arc<Self>) {
        let mut guard = self.ticker.lock();
        if guard.as_ref().is_some_and(|handle| !handle.is_cancelled()) {
            return;
        }
        let exporter = Arc::clone(self);
        *guard = Some(Ticker::spawn("telemetry_export", self.export_interval, move || {
            let exporter = Arc::clone(&exporter);
            async move {
                exporter.export_once().await;
            }
        }));
    }

    /// Cancel the ticker. Idempotent; in-flight deliveries finish or fail
    /// naturally.
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().as_ref() {
            handle.cancel();
        }
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Run one batch: encode per destination format, deliver with retry,
    /// report per-destination outcomes.
    pub async fn export_once(&self) -> Vec<ExportResult> {
        let destinations: Vec<ExportDestination> =
            self.destinations.read().values().cloned().collect();
        if destinations.is_empty() {
            return Vec::new();
        }

        // Encode each needed format once for the whole batch.
        let mut payloads: HashMap<WireFormat, String> = HashMap::new();
        for destination in &destinations {
            payloads
                .entry(destination.format)
                .or_insert_with(|| self.build_payload(destination.format));
        }

        let deliveries = destinations.into_iter().map(|destination| {
            let payload = payloads.get(&destination.format).cloned().unwrap_or_default();
            async move {
                let result = self.deliver_with_retry(&destination, &payload).await;
                (destination.name, result)
            }
        });

        let mut results = Vec::new();
        for (name, result) in join_all(deliveries).await {
            self.total_exports.fetch_add(1, Ordering::Relaxed);
            if result.success {
                self.successful_exports.fetch_add(1, Ordering::Relaxed);
                debug!(destination = %name, duration_ms = result.duration_ms, "Export delivered");
                self.bus.publish(ObservabilityEvent::ExportSucceeded {
                    destination: name,
                    duration_ms: result.duration_ms,
                });
            } else {
                self.failed_exports.fetch_add(1, Ordering::Relaxed);
                let error = result.error.clone().unwrap_or_else(|| "unknown error".to_string());
                warn!(destination = %name, %error, "Export failed after retries");
                self.bus.publish(ObservabilityEvent::ExportFailed {
                    destination: name,
                    error,
                });
            }
            results.push(result);
        }

        self.last_export_at_ms.store(self.clock.now_millis(), Ordering::Relaxed);
        results
    }

    /// One-shot delivery to a single destination, bypassing the schedule
    /// and the running counters. Used for connectivity checks.
    pub async fn test_destination(&self, name: &str) -> CommonResult<ExportResult> {
        let destination = self
            .destinations
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CommonError::Unknown { kind: "destination", name: name.to_string() })?;

        let payload = self.build_payload(destination.format);
        let started = self.clock.now();
        let outcome = destination
            .sink
            .deliver(&payload, destination.format.content_type())
            .await;
        let duration_ms = self.clock.now().duration_since(started).as_millis() as u64;

        Ok(ExportResult {
            destination: destination.name,
            success: outcome.is_ok(),
            duration_ms,
            error: outcome.err().map(|e| e.to_string()),
        })
    }

    /// Running counters snapshot.
    pub fn stats(&self) -> ExporterStats {
        let last = self.last_export_at_ms.load(Ordering::Relaxed);
        ExporterStats {
            total_exports: self.total_exports.load(Ordering::Relaxed),
            successful_exports: self.successful_exports.load(Ordering::Relaxed),
            failed_exports: self.failed_exports.load(Ordering::Relaxed),
            last_export_at_ms: (last > 0).then_some(last),
        }
    }

    async fn deliver_with_retry(
        &self,
        destination: &ExportDestination,
        payload: &str,
    ) -> ExportResult {
        let started = self.clock.now();
        let outcome = retry_with_config(&self.retry, &destination.name, |_| {
            destination.sink.deliver(payload, destination.format.content_type())
        })
        .await;
        let duration_ms = self.clock.now().duration_since(started).as_millis() as u64;

        ExportResult {
            destination: destination.name.clone(),
            success: outcome.is_ok(),
            duration_ms,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Encode the current state of all three components for one format.
    ///
    /// Prometheus destinations receive the metrics exposition text;
    /// OpenTelemetry destinations receive the shaped metrics array; JSON
    /// destinations receive the full envelope with recent events, the
    /// latest diagnostics snapshot, and aggregated health.
    fn build_payload(&self, format: WireFormat) -> String {
        match format {
            WireFormat::Prometheus => self.registry.export_prometheus(),
            WireFormat::OpenTelemetry => self.registry.export_opentelemetry().to_string(),
            WireFormat::Json => {
                let mut envelope = self.registry.export_json();
                envelope["events"] = json!(self.recorder.recent_events(BATCH_EVENT_COUNT));
                envelope["diagnostics"] = json!(self.health.latest_diagnostics());
                envelope["health"] = json!(self.health.health_status());
                envelope.to_string()
            }
        }
    }
}

impl std::fmt::Debug for TelemetryExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryExporter")
            .field("destinations", &self.destinations.read().len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
