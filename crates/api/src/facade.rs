//! The observability facade.
//!
//! Owns the four components, subscribes the cross-component wiring to the
//! event bus at composition time, and drives the periodic work: metrics
//! push, health-check runs, diagnostics collection, and batch export. One
//! explicitly constructed facade instance is owned by process bootstrap and
//! passed by reference into request-handling code; there are no hidden
//! globals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pharos_common::{Clock, CommonResult, SystemClock, Ticker, TickerHandle};
use pharos_core::health::builtin::{
    memory_pressure_rule, runtime_lag_rule, MemoryUsageCheck, RuntimeLagCheck,
};
use pharos_core::metrics::encode::sanitize_name;
use pharos_core::{
    HealthEngine, MetricRegistry, ObservabilityBus, ObservabilityConfig, SystemProbe,
    TraceRecorder,
};
use pharos_domain::{
    labels, AlertSeverity, DebugLevel, MetricDefinition, MetricKind, ObservabilityEvent,
};
use pharos_infra::{SysinfoProbe, SystemMetricsCollector, TelemetryExporter};
use tracing::debug;

/// Cooldown for the built-in memory pressure alert rule.
const MEMORY_ALERT_COOLDOWN: Duration = Duration::from_secs(300);

/// Cooldown for the built-in scheduler lag alert rule.
const LAG_ALERT_COOLDOWN: Duration = Duration::from_secs(120);

/// Composes the pipeline and exposes the instrumentation seam.
pub struct ObservabilityFacade {
    config: ObservabilityConfig,
    clock: Arc<dyn Clock>,
    bus: ObservabilityBus,
    registry: Arc<MetricRegistry>,
    recorder: Arc<TraceRecorder>,
    health: Arc<HealthEngine>,
    exporter: Arc<TelemetryExporter>,
    metric_prefix: String,
    tickers: Mutex<Vec<TickerHandle>>,
    stopped: AtomicBool,
}

impl ObservabilityFacade {
    /// Compose a facade with the real system clock and sysinfo probe.
    ///
    /// Must be called within a tokio runtime; construction spawns the bus
    /// wiring task.
    pub fn new(config: ObservabilityConfig) -> CommonResult<Arc<Self>> {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(SysinfoProbe::new()))
    }

    /// Compose a facade with an explicit clock and platform probe. Tests
    /// use this to drive time and system readings deterministically.
    pub fn with_parts(
        config: ObservabilityConfig,
        clock: Arc<dyn Clock>,
        probe: Arc<dyn SystemProbe>,
    ) -> CommonResult<Arc<Self>> {
        config.validate()?;

        let bus: ObservabilityBus = ObservabilityBus::new(config.event_bus_capacity);
        let registry = Arc::new(MetricRegistry::new(&config, clock.clone(), bus.clone()));
        let recorder = Arc::new(TraceRecorder::new(&config, clock.clone(), bus.clone()));
        let health = Arc::new(HealthEngine::new(
            &config,
            clock.clone(),
            bus.clone(),
            probe.clone(),
        ));
        let exporter = Arc::new(TelemetryExporter::new(
            &config,
            clock.clone(),
            bus.clone(),
            registry.clone(),
            recorder.clone(),
            health.clone(),
        ));

        let metric_prefix = sanitize_name(&config.service_name);
        let facade = Arc::new(Self {
            config,
            clock,
            bus,
            registry,
            recorder,
            health,
            exporter,
            metric_prefix,
            tickers: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        });

        facade.register_builtin_metrics();
        facade.register_builtin_health(probe);
        facade.spawn_wiring();
        Ok(facade)
    }

    fn register_builtin_metrics(&self) {
        let prefix = &self.metric_prefix;
        self.registry.register_metric(
            MetricDefinition::new(
                "debug_events_total",
                MetricKind::Counter,
                "Debug events recorded",
            )
            .with_labels(&["level", "category", "source"]),
        );
        self.registry.register_metric(
            MetricDefinition::new(
                "telemetry_exports_total",
                MetricKind::Counter,
                "Telemetry export outcomes",
            )
            .with_labels(&["destination", "status"]),
        );
        self.registry.register_metric(
            MetricDefinition::new(
                "telemetry_export_duration_seconds",
                MetricKind::Histogram,
                "Telemetry export delivery time",
            )
            .with_labels(&["destination"]),
        );
        self.registry.register_metric(
            MetricDefinition::new(
                format!("{prefix}_requests_total"),
                MetricKind::Counter,
                "Inbound requests by terminal status",
            )
            .with_labels(&["method", "subject", "status"]),
        );
        self.registry.register_metric(
            MetricDefinition::new(
                format!("{prefix}_request_duration_seconds"),
                MetricKind::Histogram,
                "Inbound request duration",
            )
            .with_labels(&["method", "subject"]),
        );
        self.registry.register_metric(
            MetricDefinition::new(
                format!("{prefix}_upstream_requests_total"),
                MetricKind::Counter,
                "Outbound upstream calls by terminal status",
            )
            .with_labels(&["service", "endpoint", "subject", "status"]),
        );
        self.registry.register_metric(
            MetricDefinition::new(
                format!("{prefix}_upstream_request_duration_seconds"),
                MetricKind::Histogram,
                "Outbound upstream call duration",
            )
            .with_labels(&["service", "endpoint"]),
        );
    }

    fn register_builtin_health(&self, probe: Arc<dyn SystemProbe>) {
        self.health.register_health_check(Arc::new(MemoryUsageCheck::new(
            probe.clone(),
            self.clock.clone(),
            self.config.memory_warning_ratio,
            self.config.memory_critical_ratio,
        )));
        self.health.register_health_check(Arc::new(RuntimeLagCheck::new(
            self.config.lag_warning,
            self.config.lag_critical,
        )));

        self.health.register_alert_rule(memory_pressure_rule(
            self.config.memory_critical_ratio,
            MEMORY_ALERT_COOLDOWN,
        ));
        self.health.register_alert_rule(runtime_lag_rule(LAG_ALERT_COOLDOWN));

        self.registry.add_collector(Arc::new(SystemMetricsCollector::new(probe)));
    }

    /// Subscribe the cross-component forwarding to the bus.
    ///
    /// The task ends on its own once every bus sender is gone; `stop` does
    /// not tear it down, so instrumentation recorded after shutdown still
    /// feeds the counters.
    fn spawn_wiring(self: &Arc<Self>) {
        let mut rx = self.bus.subscribe();
        let registry = self.registry.clone();
        let recorder = self.recorder.clone();

        tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Wiring subscriber lagged");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };

                match event {
                    ObservabilityEvent::DebugEventLogged(debug_event) => {
                        registry.increment_counter(
                            "debug_events_total",
                            1.0,
                            labels(&[
                                ("level", debug_event.level.as_str()),
                                ("category", &debug_event.category),
                                ("source", &debug_event.source),
                            ]),
                        );
                    }
                    ObservabilityEvent::AlertTriggered(alert) => {
                        let level = match alert.severity {
                            AlertSeverity::Critical => DebugLevel::Error,
                            AlertSeverity::Info | AlertSeverity::Warning => DebugLevel::Warn,
                        };
                        recorder.log_event(
                            level,
                            "alerts",
                            alert.message.clone(),
                            labels(&[
                                ("rule", &alert.rule),
                                ("alert_id", &alert.id),
                                ("severity", alert.severity.as_str()),
                            ]),
                            "alerting",
                            None,
                            None,
                        );
                    }
                    ObservabilityEvent::CollectorFailed { collector, error } => {
                        recorder.log_event(
                            DebugLevel::Error,
                            "metrics",
                            format!("collector '{collector}' failed: {error}"),
                            Default::default(),
                            "metrics",
                            None,
                            None,
                        );
                    }
                    ObservabilityEvent::PushCompleted { target, success: false, error } => {
                        recorder.log_event(
                            DebugLevel::Warn,
                            "metrics",
                            format!(
                                "push to '{}' failed: {}",
                                target,
                                error.unwrap_or_else(|| "unknown error".to_string())
                            ),
                            Default::default(),
                            "metrics",
                            None,
                            None,
                        );
                    }
                    ObservabilityEvent::ExportSucceeded { destination, duration_ms } => {
                        registry.increment_counter(
                            "telemetry_exports_total",
                            1.0,
                            labels(&[("destination", &destination), ("status", "success")]),
                        );
                        registry.record_histogram(
                            "telemetry_export_duration_seconds",
                            duration_ms as f64 / 1000.0,
                            labels(&[("destination", &destination)]),
                        );
                    }
                    ObservabilityEvent::ExportFailed { destination, .. } => {
                        registry.increment_counter(
                            "telemetry_exports_total",
                            1.0,
                            labels(&[("destination", &destination), ("status", "error")]),
                        );
                    }
                    ObservabilityEvent::MetricRecorded { .. }
                    | ObservabilityEvent::PushCompleted { .. } => {}
                }
            }
        });
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Spawn the periodic work: metrics push, health runs, diagnostics
    /// collection, and batch export. Intervals of zero stay disabled.
    /// Calling `start` twice is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut tickers = self.tickers.lock();
        if !tickers.is_empty() {
            return;
        }

        let registry = self.registry.clone();
        tickers.push(Ticker::spawn(
            "metrics_push",
            self.config.metrics_push_interval,
            move || {
                let registry = registry.clone();
                async move {
                    registry.push().await;
                }
            },
        ));

        let health = self.health.clone();
        tickers.push(Ticker::spawn(
            "health_checks",
            self.config.health_check_interval,
            move || {
                let health = health.clone();
                async move {
                    health.run_health_checks().await;
                    health.check_alerts();
                }
            },
        ));

        let health = self.health.clone();
        tickers.push(Ticker::spawn(
            "diagnostics",
            self.config.diagnostics_interval,
            move || {
                let health = health.clone();
                async move {
                    health.collect_system_diagnostics();
                    health.check_alerts();
                }
            },
        ));

        self.exporter.start_batch_export();
    }

    /// Cancel all four timers. Idempotent; in-flight pushes and exports
    /// finish or fail naturally rather than being aborted.
    pub fn stop(&self) {
        let first_stop = !self.stopped.swap(true, Ordering::SeqCst);
        for ticker in self.tickers.lock().iter() {
            ticker.cancel();
        }
        self.exporter.stop();
        if first_stop {
            debug!("Observability facade stopped");
        }
    }

    /// Whether `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Component access
    // ========================================================================

    /// Pipeline configuration.
    pub fn config(&self) -> &ObservabilityConfig {
        &self.config
    }

    /// Clock the pipeline stamps with.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The event bus; subscribe for custom forwarding.
    pub fn bus(&self) -> &ObservabilityBus {
        &self.bus
    }

    /// The metric registry.
    pub fn metrics(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// The trace/debug recorder.
    pub fn recorder(&self) -> &Arc<TraceRecorder> {
        &self.recorder
    }

    /// The health & alerting engine.
    pub fn health(&self) -> &Arc<HealthEngine> {
        &self.health
    }

    /// The telemetry exporter.
    pub fn exporter(&self) -> &Arc<TelemetryExporter> {
        &self.exporter
    }

    /// Metric name prefix derived from the service name.
    pub(crate) fn metric_prefix(&self) -> &str {
        &self.metric_prefix
    }
}

impl std::fmt::Debug for ObservabilityFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservabilityFacade")
            .field("service", &self.config.service_name)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
