//! Health reporting and full-payload observability export.

use std::collections::BTreeMap;

use pharos_core::health::builtin::RUNTIME_LAG_CHECK;
use pharos_domain::{
    Alert, AlertFilter, ExporterStats, HealthCheckResult, HealthTier, SystemDiagnostics,
    WireFormat,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::facade::ObservabilityFacade;

/// Debug events and traces included in a full JSON export.
const EXPORT_RECENT_COUNT: usize = 50;

/// Assembled view of current pipeline state with derived recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// RFC 3339 generation timestamp.
    pub generated_at: String,
    /// Service the report describes.
    pub service: String,
    /// Worst-of health tier.
    pub overall: HealthTier,
    /// Current result per health check.
    pub checks: BTreeMap<String, HealthCheckResult>,
    /// Latest diagnostics snapshot, when one has been collected.
    pub diagnostics: Option<SystemDiagnostics>,
    /// Alerts not yet acknowledged, newest first.
    pub unacknowledged_alerts: Vec<Alert>,
    /// Exporter running counters.
    pub exporter: ExporterStats,
    /// Human-readable recommendations derived from threshold checks.
    pub recommendations: Vec<String>,
}

impl ObservabilityFacade {
    /// Assemble a health report from current state.
    pub fn generate_health_report(&self) -> HealthReport {
        let status = self.health().health_status();
        let diagnostics = self.health().latest_diagnostics();
        let unacknowledged = self.health().alerts(&AlertFilter {
            acknowledged: Some(false),
            ..Default::default()
        });
        let exporter = self.exporter().stats();

        let recommendations =
            self.recommendations(&status.checks, diagnostics.as_ref(), &exporter);

        HealthReport {
            generated_at: rfc3339(self.clock().now_millis()),
            service: self.config().service_name.clone(),
            overall: status.overall,
            checks: status.checks,
            diagnostics,
            unacknowledged_alerts: unacknowledged,
            exporter,
            recommendations,
        }
    }

    /// Export current observability state in the requested format.
    ///
    /// Prometheus yields the metrics exposition text; OpenTelemetry yields
    /// the shaped metrics array; JSON yields the full payload: report,
    /// metrics envelope, and recent events/traces.
    pub fn export_observability_data(&self, format: WireFormat) -> String {
        match format {
            WireFormat::Prometheus => self.metrics().export_prometheus(),
            WireFormat::OpenTelemetry => self.metrics().export_opentelemetry().to_string(),
            WireFormat::Json => json!({
                "report": self.generate_health_report(),
                "metrics": self.metrics().export_json(),
                "recent_events": self.recorder().recent_events(EXPORT_RECENT_COUNT),
                "recent_traces": self.recorder().recent_traces(EXPORT_RECENT_COUNT),
            })
            .to_string(),
        }
    }

    fn recommendations(
        &self,
        checks: &BTreeMap<String, HealthCheckResult>,
        diagnostics: Option<&SystemDiagnostics>,
        exporter: &ExporterStats,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();
        let config = self.config();

        if let Some(ratio) = diagnostics.and_then(|d| d.memory.used_ratio()) {
            if ratio >= config.memory_critical_ratio {
                recommendations.push(format!(
                    "Memory usage at {:.0}% is critical; shed load or increase capacity",
                    ratio * 100.0
                ));
            } else if ratio >= config.memory_warning_ratio {
                recommendations.push(format!(
                    "Memory usage at {:.0}% is elevated; investigate retention and cache sizes",
                    ratio * 100.0
                ));
            }
        }

        if checks.get(RUNTIME_LAG_CHECK).is_some_and(|check| {
            matches!(check.status, HealthTier::Warning | HealthTier::Critical)
        }) {
            recommendations.push(
                "Async scheduler lag above threshold; look for blocking work on the runtime"
                    .to_string(),
            );
        }

        let critical_count =
            checks.values().filter(|c| c.status == HealthTier::Critical).count();
        if critical_count > 0 {
            recommendations.push(format!(
                "{critical_count} health check(s) critical; see check metadata for detail"
            ));
        }

        if exporter.failed_exports > 0 && exporter.failed_exports >= exporter.successful_exports
        {
            recommendations.push(
                "Telemetry exports are failing; verify destination connectivity and auth"
                    .to_string(),
            );
        }

        recommendations
    }
}

/// Render epoch milliseconds as RFC 3339.
fn rfc3339(timestamp_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms as i64)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
