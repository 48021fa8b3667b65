//! Built-in health checks and alert rules.
//!
//! Two checks ship with the facade: machine memory pressure (via the
//! platform probe) and tokio scheduler lag, each with warning/critical
//! tiers. The matching alert rules carry independent cooldowns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pharos_common::{Clock, CommonResult};
use pharos_domain::{AlertSeverity, CheckOutcome, HealthTier};
use serde_json::json;

use super::alerts::AlertRule;
use super::HealthCheck;
use crate::ports::SystemProbe;

/// Name of the built-in memory check and the key its rule looks up.
pub const MEMORY_CHECK: &str = "memory_usage";

/// Name of the built-in scheduler-lag check and the key its rule looks up.
pub const RUNTIME_LAG_CHECK: &str = "runtime_lag";

/// Sleep target used to measure scheduler lag.
const LAG_PROBE_SLEEP: Duration = Duration::from_millis(10);

/// Two-tier machine memory usage check.
pub struct MemoryUsageCheck {
    probe: Arc<dyn SystemProbe>,
    clock: Arc<dyn Clock>,
    warning_ratio: f64,
    critical_ratio: f64,
}

impl MemoryUsageCheck {
    /// Create the check with warning/critical used-ratio thresholds.
    pub fn new(
        probe: Arc<dyn SystemProbe>,
        clock: Arc<dyn Clock>,
        warning_ratio: f64,
        critical_ratio: f64,
    ) -> Self {
        Self { probe, clock, warning_ratio, critical_ratio }
    }
}

#[async_trait]
impl HealthCheck for MemoryUsageCheck {
    fn name(&self) -> &str {
        MEMORY_CHECK
    }

    fn category(&self) -> &str {
        "system"
    }

    async fn execute(&self) -> CommonResult<CheckOutcome> {
        let snapshot = self.probe.snapshot(self.clock.now_millis());
        let Some(ratio) = snapshot.memory.used_ratio() else {
            return Ok(CheckOutcome::unknown("memory statistics unavailable on this platform"));
        };

        let percent = ratio * 100.0;
        let outcome = if ratio >= self.critical_ratio {
            CheckOutcome::critical(format!("memory usage at {percent:.1}%"))
        } else if ratio >= self.warning_ratio {
            CheckOutcome::warning(format!("memory usage at {percent:.1}%"))
        } else {
            CheckOutcome::healthy(format!("memory usage at {percent:.1}%"))
        };

        Ok(outcome
            .with_metadata("used_ratio", json!(ratio))
            .with_metadata("warning_ratio", json!(self.warning_ratio))
            .with_metadata("critical_ratio", json!(self.critical_ratio)))
    }
}

/// Two-tier tokio scheduler lag check.
///
/// Sleeps for a short target duration and reports how far past the target
/// the runtime woke it up. Sustained lag means the process is starving its
/// event loop.
pub struct RuntimeLagCheck {
    warning: Duration,
    critical: Duration,
}

impl RuntimeLagCheck {
    /// Create the check with warning/critical lag thresholds.
    pub fn new(warning: Duration, critical: Duration) -> Self {
        Self { warning, critical }
    }
}

#[async_trait]
impl HealthCheck for RuntimeLagCheck {
    fn name(&self) -> &str {
        RUNTIME_LAG_CHECK
    }

    fn category(&self) -> &str {
        "runtime"
    }

    async fn execute(&self) -> CommonResult<CheckOutcome> {
        let started = Instant::now();
        tokio::time::sleep(LAG_PROBE_SLEEP).await;
        let lag = started.elapsed().saturating_sub(LAG_PROBE_SLEEP);

        let lag_ms = lag.as_millis() as u64;
        let outcome = if lag >= self.critical {
            CheckOutcome::critical(format!("scheduler lag {lag_ms}ms"))
        } else if lag >= self.warning {
            CheckOutcome::warning(format!("scheduler lag {lag_ms}ms"))
        } else {
            CheckOutcome::healthy(format!("scheduler lag {lag_ms}ms"))
        };

        Ok(outcome.with_metadata("lag_ms", json!(lag_ms)))
    }
}

/// Alert rule raising a critical alert when the latest diagnostics show
/// memory above `critical_ratio`.
pub fn memory_pressure_rule(critical_ratio: f64, cooldown: Duration) -> AlertRule {
    AlertRule::new(
        "memory_pressure",
        AlertSeverity::Critical,
        "machine memory usage above critical threshold",
        cooldown,
        move |ctx| {
            Ok(ctx
                .diagnostics
                .and_then(|d| d.memory.used_ratio())
                .is_some_and(|ratio| ratio >= critical_ratio))
        },
    )
}

/// Alert rule raising a warning when the built-in scheduler-lag check is
/// degraded.
pub fn runtime_lag_rule(cooldown: Duration) -> AlertRule {
    AlertRule::new(
        "runtime_lag",
        AlertSeverity::Warning,
        "async scheduler lag above threshold",
        cooldown,
        |ctx| {
            Ok(ctx.health.get(RUNTIME_LAG_CHECK).is_some_and(|result| {
                matches!(result.status, HealthTier::Warning | HealthTier::Critical)
            }))
        },
    )
}
