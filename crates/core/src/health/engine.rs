//! The health & alerting engine.
//!
//! Runs registered asynchronous probes, captures system diagnostics
//! through the platform probe, aggregates an overall status, and evaluates
//! cooldown-gated alert rules against the latest data. A failing probe
//! yields a critical result; a failing predicate yields no trigger; the
//! engine itself never fails a run.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use pharos_common::Clock;
use pharos_domain::{
    Alert, AlertFilter, HealthCheckResult, HealthTier, ObservabilityEvent, OverallHealth,
    SystemDiagnostics,
};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::alerts::{AlertContext, AlertRule};
use super::HealthCheck;
use crate::config::ObservabilityConfig;
use crate::ports::SystemProbe;
use crate::ObservabilityBus;

/// Health-check execution, diagnostics collection, and alert evaluation.
pub struct HealthEngine {
    clock: Arc<dyn Clock>,
    bus: ObservabilityBus,
    probe: Arc<dyn SystemProbe>,
    max_alerts: usize,
    checks: RwLock<Vec<Arc<dyn HealthCheck>>>,
    results: RwLock<BTreeMap<String, HealthCheckResult>>,
    latest_diagnostics: RwLock<Option<SystemDiagnostics>>,
    rules: RwLock<Vec<Arc<AlertRule>>>,
    alerts: RwLock<VecDeque<Alert>>,
}

impl HealthEngine {
    /// Create an engine from pipeline configuration.
    pub fn new(
        config: &ObservabilityConfig,
        clock: Arc<dyn Clock>,
        bus: ObservabilityBus,
        probe: Arc<dyn SystemProbe>,
    ) -> Self {
        Self {
            clock,
            bus,
            probe,
            max_alerts: config.max_alerts.max(1),
            checks: RwLock::new(Vec::new()),
            results: RwLock::new(BTreeMap::new()),
            latest_diagnostics: RwLock::new(None),
            rules: RwLock::new(Vec::new()),
            alerts: RwLock::new(VecDeque::new()),
        }
    }

    // ========================================================================
    // Health checks
    // ========================================================================

    /// Register a health check. Re-registering a name replaces the earlier
    /// check.
    pub fn register_health_check(&self, check: Arc<dyn HealthCheck>) {
        let mut checks = self.checks.write();
        checks.retain(|c| c.name() != check.name());
        checks.push(check);
    }

    /// Execute every registered check once, overwriting prior results.
    ///
    /// A check that returns an error yields a critical result carrying the
    /// error detail in metadata; the run itself always completes.
    pub async fn run_health_checks(&self) -> Vec<HealthCheckResult> {
        let checks: Vec<Arc<dyn HealthCheck>> = self.checks.read().clone();
        let mut run_results = Vec::with_capacity(checks.len());

        for check in checks {
            let checked_at_ms = self.clock.now_millis();
            let started = self.clock.now();
            let outcome = check.execute().await;
            let duration_ms = self.clock.now().duration_since(started).as_millis() as u64;

            let result = match outcome {
                Ok(outcome) => HealthCheckResult {
                    name: check.name().to_string(),
                    category: check.category().to_string(),
                    status: outcome.status,
                    message: outcome.message,
                    checked_at_ms,
                    duration_ms,
                    metadata: outcome.metadata,
                },
                Err(error) => {
                    warn!(check = check.name(), %error, "Health check failed");
                    let mut metadata = BTreeMap::new();
                    metadata.insert("error".to_string(), json!(error.to_string()));
                    HealthCheckResult {
                        name: check.name().to_string(),
                        category: check.category().to_string(),
                        status: HealthTier::Critical,
                        message: format!("check failed: {error}"),
                        checked_at_ms,
                        duration_ms,
                        metadata,
                    }
                }
            };
            run_results.push(result);
        }

        let mut results = self.results.write();
        for result in &run_results {
            results.insert(result.name.clone(), result.clone());
        }
        drop(results);

        run_results
    }

    /// Aggregate current results into an overall status.
    pub fn health_status(&self) -> OverallHealth {
        OverallHealth::from_results(self.results.read().values().cloned())
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Capture one immutable diagnostics snapshot through the platform
    /// probe and retain it as the latest.
    pub fn collect_system_diagnostics(&self) -> SystemDiagnostics {
        let snapshot = self.probe.snapshot(self.clock.now_millis());
        *self.latest_diagnostics.write() = Some(snapshot.clone());
        debug!(captured_at_ms = snapshot.captured_at_ms, "Collected system diagnostics");
        snapshot
    }

    /// The most recent diagnostics snapshot, when one has been collected.
    pub fn latest_diagnostics(&self) -> Option<SystemDiagnostics> {
        self.latest_diagnostics.read().clone()
    }

    // ========================================================================
    // Alerting
    // ========================================================================

    /// Register an alert rule.
    pub fn register_alert_rule(&self, rule: AlertRule) {
        let mut rules = self.rules.write();
        rules.retain(|r| r.name() != rule.name());
        rules.push(Arc::new(rule));
    }

    /// Evaluate every rule against the latest snapshot and health results.
    ///
    /// Rules inside their cooldown window are skipped. A triggering rule
    /// emits an [`Alert`] into the bounded history and onto the bus, and
    /// restarts its cooldown. A predicate error counts as not triggered.
    /// Returns the alerts raised by this invocation.
    pub fn check_alerts(&self) -> Vec<Alert> {
        let diagnostics = self.latest_diagnostics.read().clone();
        let results = self.results.read().clone();
        let context = AlertContext { diagnostics: diagnostics.as_ref(), health: &results };

        let rules: Vec<Arc<AlertRule>> = self.rules.read().clone();
        let mut triggered = Vec::new();

        for rule in rules {
            let now_ms = self.clock.now_millis();
            if !rule.cooldown_elapsed(now_ms) {
                continue;
            }
            match rule.evaluate(&context) {
                Ok(true) => {
                    rule.mark_triggered(now_ms);
                    let alert = Alert {
                        id: Uuid::new_v4().to_string(),
                        rule: rule.name().to_string(),
                        severity: rule.severity(),
                        message: rule.message().to_string(),
                        timestamp_ms: now_ms,
                        data: json!({
                            "diagnostics": &diagnostics,
                            "health": &results,
                        }),
                        acknowledged: false,
                        acknowledged_by: None,
                        acknowledged_at_ms: None,
                    };
                    self.append_alert(alert.clone());
                    self.bus.publish(ObservabilityEvent::AlertTriggered(alert.clone()));
                    triggered.push(alert);
                }
                Ok(false) => {}
                Err(error) => {
                    warn!(rule = rule.name(), %error, "Alert predicate failed, not triggering");
                }
            }
        }
        triggered
    }

    /// Mark an alert acknowledged. Returns whether the id was found.
    pub fn acknowledge_alert(&self, alert_id: &str, who: impl Into<String>) -> bool {
        let mut alerts = self.alerts.write();
        if let Some(alert) = alerts.iter_mut().find(|a| a.id == alert_id) {
            alert.acknowledged = true;
            alert.acknowledged_by = Some(who.into());
            alert.acknowledged_at_ms = Some(self.clock.now_millis());
            true
        } else {
            false
        }
    }

    /// Query the alert history, newest first.
    pub fn alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        self.alerts.read().iter().rev().filter(|a| filter.matches(a)).cloned().collect()
    }

    fn append_alert(&self, alert: Alert) {
        let mut alerts = self.alerts.write();
        alerts.push_back(alert);
        while alerts.len() > self.max_alerts {
            alerts.pop_front();
        }
    }
}

impl std::fmt::Debug for HealthEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthEngine")
            .field("checks", &self.checks.read().len())
            .field("rules", &self.rules.read().len())
            .field("alerts", &self.alerts.read().len())
            .finish_non_exhaustive()
    }
}
