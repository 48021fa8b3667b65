//! Integration tests for the observability facade.
//!
//! Exercises the instrumentation seam contract (finish exactly once on
//! every exit path), the bus wiring into counters and correlated events,
//! and the assembled health report.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pharos_api::ObservabilityFacade;
use pharos_common::{CommonResult, MockClock};
use pharos_core::{DeliverySink, ObservabilityConfig, SystemProbe};
use pharos_domain::{
    labels, AlertFilter, DebugLevel, HealthTier, MemoryStats, SystemDiagnostics, WireFormat,
};
use pharos_infra::ExportDestination;

/// Probe reporting a fixed memory ratio.
struct FixedMemoryProbe {
    used: u64,
    total: u64,
}

impl SystemProbe for FixedMemoryProbe {
    fn snapshot(&self, captured_at_ms: u64) -> SystemDiagnostics {
        let mut snapshot = SystemDiagnostics::unknown(captured_at_ms);
        snapshot.memory =
            MemoryStats { total_bytes: Some(self.total), used_bytes: Some(self.used) };
        snapshot
    }
}

/// Sink capturing payloads.
#[derive(Default)]
struct CapturingSink {
    payloads: Mutex<Vec<String>>,
}

#[async_trait]
impl DeliverySink for CapturingSink {
    async fn deliver(&self, payload: &str, _content_type: &str) -> CommonResult<()> {
        self.payloads.lock().push(payload.to_string());
        Ok(())
    }
}

fn facade_with_memory(used: u64, total: u64) -> (Arc<ObservabilityFacade>, MockClock) {
    let clock = MockClock::new();
    let facade = ObservabilityFacade::with_parts(
        ObservabilityConfig { service_name: "gateway".to_string(), ..Default::default() },
        Arc::new(clock.clone()),
        Arc::new(FixedMemoryProbe { used, total }),
    )
    .expect("facade composes");
    (facade, clock)
}

#[tokio::test]
async fn finish_settles_span_and_terminal_metrics_exactly_once() {
    let (facade, clock) = facade_with_memory(10, 100);

    let guard = facade.instrument_request("tool.call", "property.list", BTreeMap::new());
    let trace_id = guard.trace_id().to_string();

    // Started counter is visible immediately.
    assert_eq!(
        facade.metrics().latest_value(
            "gateway_requests_total",
            &labels(&[
                ("method", "tool.call"),
                ("subject", "property.list"),
                ("status", "started")
            ])
        ),
        Some(1.0)
    );

    clock.advance_millis(40);
    guard.finish(None, BTreeMap::new());

    assert_eq!(facade.recorder().open_span_count(), 0);
    let trace = facade.recorder().trace(&trace_id).expect("trace retained");
    assert_eq!(trace.spans[0].duration_ms(), Some(40));

    assert_eq!(
        facade.metrics().latest_value(
            "gateway_requests_total",
            &labels(&[
                ("method", "tool.call"),
                ("subject", "property.list"),
                ("status", "success")
            ])
        ),
        Some(1.0)
    );
    assert_eq!(
        facade.metrics().latest_value(
            "gateway_request_duration_seconds_count",
            &labels(&[("method", "tool.call"), ("subject", "property.list")])
        ),
        Some(1.0)
    );

    // The completion event is correlated to the trace.
    let completion = facade
        .recorder()
        .recent_events(10)
        .into_iter()
        .find(|e| e.category == "request")
        .expect("completion event logged");
    assert_eq!(completion.trace_id.as_deref(), Some(trace_id.as_str()));
    assert_eq!(completion.level, DebugLevel::Info);
}

#[tokio::test]
async fn dropped_guard_finishes_with_error_status() {
    let (facade, _clock) = facade_with_memory(10, 100);

    {
        let _guard = facade.instrument_request("tool.call", "dns.zone", BTreeMap::new());
        // Early return / unwind path: the guard goes out of scope
        // without an explicit finish.
    }

    assert_eq!(facade.recorder().open_span_count(), 0);
    assert_eq!(
        facade.metrics().latest_value(
            "gateway_requests_total",
            &labels(&[("method", "tool.call"), ("subject", "dns.zone"), ("status", "error")])
        ),
        Some(1.0)
    );
}

#[tokio::test]
async fn upstream_variant_uses_upstream_series() {
    let (facade, _clock) = facade_with_memory(10, 100);

    let guard = facade.instrument_api_call("cdn", "/v1/properties", "cust-42");
    guard.finish(Some("502 from origin"), BTreeMap::new());

    assert_eq!(
        facade.metrics().latest_value(
            "gateway_upstream_requests_total",
            &labels(&[
                ("endpoint", "/v1/properties"),
                ("service", "cdn"),
                ("status", "error"),
                ("subject", "cust-42")
            ])
        ),
        Some(1.0)
    );
}

#[tokio::test]
async fn debug_events_feed_the_wired_counter() {
    let (facade, _clock) = facade_with_memory(10, 100);

    facade.recorder().log_event(
        DebugLevel::Warn,
        "cache",
        "eviction storm",
        BTreeMap::new(),
        "cache",
        None,
        None,
    );

    // The wiring subscriber runs as a background task.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        facade.metrics().latest_value(
            "debug_events_total",
            &labels(&[("category", "cache"), ("level", "warn"), ("source", "cache")])
        ),
        Some(1.0)
    );
}

#[tokio::test]
async fn triggered_alerts_are_logged_as_correlated_events() {
    // 97% memory: the built-in memory_pressure rule fires after a
    // diagnostics collection.
    let (facade, _clock) = facade_with_memory(97, 100);

    facade.health().collect_system_diagnostics();
    let triggered = facade.health().check_alerts();
    assert_eq!(triggered.len(), 1);
    assert_eq!(triggered[0].rule, "memory_pressure");

    tokio::time::sleep(Duration::from_millis(50)).await;

    let alert_event = facade
        .recorder()
        .recent_events(10)
        .into_iter()
        .find(|e| e.category == "alerts")
        .expect("alert forwarded to recorder");
    assert_eq!(alert_event.level, DebugLevel::Error);
    assert_eq!(
        alert_event.context.get("rule").map(String::as_str),
        Some("memory_pressure")
    );
}

#[tokio::test]
async fn export_outcomes_feed_the_wired_series() {
    let (facade, _clock) = facade_with_memory(10, 100);
    facade
        .exporter()
        .add_destination(ExportDestination::new(
            "collector",
            WireFormat::Json,
            Arc::new(CapturingSink::default()),
        ));

    facade.exporter().export_once().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        facade.metrics().latest_value(
            "telemetry_exports_total",
            &labels(&[("destination", "collector"), ("status", "success")])
        ),
        Some(1.0)
    );
    assert_eq!(
        facade.metrics().latest_value(
            "telemetry_export_duration_seconds_count",
            &labels(&[("destination", "collector")])
        ),
        Some(1.0)
    );
}

#[tokio::test]
async fn health_report_carries_recommendations_and_alerts() {
    let (facade, _clock) = facade_with_memory(97, 100);

    facade.health().collect_system_diagnostics();
    facade.health().run_health_checks().await;
    facade.health().check_alerts();

    let report = facade.generate_health_report();
    assert_eq!(report.service, "gateway");
    assert_eq!(report.overall, HealthTier::Critical);
    assert!(report.checks.contains_key("memory_usage"));
    assert!(!report.unacknowledged_alerts.is_empty());
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.to_lowercase().contains("memory")));
    assert!(report.generated_at.starts_with("20"));

    // Acknowledged alerts drop out of the report.
    let alert_id = report.unacknowledged_alerts[0].id.clone();
    assert!(facade.health().acknowledge_alert(&alert_id, "oncall"));
    let report = facade.generate_health_report();
    assert!(report.unacknowledged_alerts.is_empty());
    assert_eq!(
        facade
            .health()
            .alerts(&AlertFilter { acknowledged: Some(true), ..Default::default() })
            .len(),
        1
    );
}

#[tokio::test]
async fn json_export_includes_report_and_recent_state() {
    let (facade, _clock) = facade_with_memory(10, 100);
    let guard = facade.instrument_request("tool.call", "reports.usage", BTreeMap::new());
    guard.finish(None, BTreeMap::new());

    let payload = facade.export_observability_data(WireFormat::Json);
    let value: serde_json::Value = serde_json::from_str(&payload).expect("valid JSON");
    assert!(value["report"]["overall"].is_string());
    assert!(value["metrics"]["metrics"].is_array());
    assert!(value["recent_events"].is_array());
    assert!(value["recent_traces"].is_array());

    // The Prometheus variant is the raw exposition text.
    let text = facade.export_observability_data(WireFormat::Prometheus);
    assert!(text.contains("# TYPE gateway_requests_total counter"));
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let config = ObservabilityConfig {
        service_name: "gateway".to_string(),
        health_check_interval: Duration::from_millis(10),
        diagnostics_interval: Duration::from_millis(10),
        export_interval: Duration::from_millis(10),
        metrics_push_interval: Duration::ZERO,
        ..Default::default()
    };
    let facade = ObservabilityFacade::with_parts(
        config,
        Arc::new(MockClock::new()),
        Arc::new(FixedMemoryProbe { used: 10, total: 100 }),
    )
    .expect("facade composes");

    facade.start();
    facade.start(); // second start is a no-op
    tokio::time::sleep(Duration::from_millis(40)).await;

    // The health ticker has produced results by now.
    assert!(!facade.health().health_status().checks.is_empty());

    facade.stop();
    facade.stop(); // stop is idempotent
    assert!(facade.is_stopped());

    // Recording still works after stop; only the timers are cancelled.
    let guard = facade.instrument_request("tool.call", "late", BTreeMap::new());
    guard.finish(None, BTreeMap::new());
    assert_eq!(facade.recorder().open_span_count(), 0);
}
