//! Alert rules: cooldown-gated predicates over diagnostics and health data.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use pharos_common::CommonResult;
use pharos_domain::{AlertSeverity, HealthCheckResult, SystemDiagnostics};

/// Data an alert predicate evaluates against: the latest diagnostics
/// snapshot (when one has been collected) and the current health results.
#[derive(Debug, Clone, Copy)]
pub struct AlertContext<'a> {
    /// Latest diagnostics snapshot.
    pub diagnostics: Option<&'a SystemDiagnostics>,
    /// Current health-check results, keyed by check name.
    pub health: &'a BTreeMap<String, HealthCheckResult>,
}

type AlertPredicate = dyn Fn(&AlertContext<'_>) -> CommonResult<bool> + Send + Sync;

/// A registered alert rule.
///
/// The predicate runs after each diagnostics/health cycle. A rule inside
/// its cooldown window is skipped entirely; a predicate error is caught and
/// treated as "did not trigger".
pub struct AlertRule {
    name: String,
    severity: AlertSeverity,
    message: String,
    cooldown: Duration,
    predicate: Box<AlertPredicate>,
    last_triggered_ms: Mutex<Option<u64>>,
}

impl AlertRule {
    /// Create a rule.
    pub fn new<P>(
        name: impl Into<String>,
        severity: AlertSeverity,
        message: impl Into<String>,
        cooldown: Duration,
        predicate: P,
    ) -> Self
    where
        P: Fn(&AlertContext<'_>) -> CommonResult<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            severity,
            message: message.into(),
            cooldown,
            predicate: Box::new(predicate),
            last_triggered_ms: Mutex::new(None),
        }
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Severity of alerts this rule raises.
    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    /// Message carried by alerts this rule raises.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the cooldown window has elapsed at `now_ms`.
    pub fn cooldown_elapsed(&self, now_ms: u64) -> bool {
        let last = *self.last_triggered_ms.lock();
        match last {
            Some(last_ms) => now_ms.saturating_sub(last_ms) >= self.cooldown.as_millis() as u64,
            None => true,
        }
    }

    /// Record a trigger at `now_ms`, starting the cooldown window.
    pub fn mark_triggered(&self, now_ms: u64) {
        *self.last_triggered_ms.lock() = Some(now_ms);
    }

    /// Run the predicate.
    pub fn evaluate(&self, context: &AlertContext<'_>) -> CommonResult<bool> {
        (self.predicate)(context)
    }
}

impl std::fmt::Debug for AlertRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertRule")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for health::alerts.
    use super::*;

    fn context_fixture() -> BTreeMap<String, HealthCheckResult> {
        BTreeMap::new()
    }

    #[test]
    fn test_cooldown_window() {
        let rule = AlertRule::new(
            "r",
            AlertSeverity::Warning,
            "m",
            Duration::from_millis(5000),
            |_| Ok(true),
        );

        assert!(rule.cooldown_elapsed(0));
        rule.mark_triggered(1000);
        assert!(!rule.cooldown_elapsed(1500));
        assert!(!rule.cooldown_elapsed(5999));
        assert!(rule.cooldown_elapsed(6000));
    }

    #[test]
    fn test_predicate_sees_context() {
        let health = context_fixture();
        let context = AlertContext { diagnostics: None, health: &health };
        let rule = AlertRule::new(
            "needs-diagnostics",
            AlertSeverity::Info,
            "m",
            Duration::ZERO,
            |ctx| Ok(ctx.diagnostics.is_some()),
        );
        assert_eq!(rule.evaluate(&context).expect("predicate"), false);
    }
}
