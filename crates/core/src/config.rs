//! Pipeline configuration.
//!
//! One [`ObservabilityConfig`] drives the whole facade: retention bounds,
//! the four timer intervals, retry policy, and built-in check thresholds.
//! Intervals set to zero disable the corresponding timer.

use std::time::Duration;

use pharos_common::utils::duration_millis;
use pharos_common::{CommonError, CommonResult};
use serde::{Deserialize, Serialize};

/// Configuration for the observability pipeline.
///
/// Deserializes from TOML/JSON with every field optional; missing fields
/// take the documented defaults. Durations are expressed in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name used as the metric prefix and export source.
    pub service_name: String,

    /// Capacity of the broadcast event bus.
    pub event_bus_capacity: usize,

    /// Maximum retained samples per metric name.
    pub max_metric_history: usize,

    /// Maximum retained debug events.
    pub max_debug_events: usize,

    /// Maximum retained traces.
    pub max_traces: usize,

    /// Traces older than this are pruned regardless of count.
    #[serde(with = "duration_millis")]
    pub trace_retention: Duration,

    /// Maximum retained alerts.
    pub max_alerts: usize,

    /// Interval between health-check runs. Zero disables the timer.
    #[serde(with = "duration_millis")]
    pub health_check_interval: Duration,

    /// Interval between diagnostics collections. Zero disables the timer.
    #[serde(with = "duration_millis")]
    pub diagnostics_interval: Duration,

    /// Interval between metric pushes. Zero disables the timer.
    #[serde(with = "duration_millis")]
    pub metrics_push_interval: Duration,

    /// Interval between telemetry batch exports. Zero disables the timer.
    #[serde(with = "duration_millis")]
    pub export_interval: Duration,

    /// Delivery attempts per export destination, including the first.
    pub max_retry_attempts: u32,

    /// Initial backoff before the first export redelivery.
    #[serde(with = "duration_millis")]
    pub retry_initial_backoff: Duration,

    /// Memory used/total ratio above which the built-in check warns.
    pub memory_warning_ratio: f64,

    /// Memory used/total ratio above which the built-in check is critical.
    pub memory_critical_ratio: f64,

    /// Scheduler lag above which the built-in runtime check warns.
    #[serde(with = "duration_millis")]
    pub lag_warning: Duration,

    /// Scheduler lag above which the built-in runtime check is critical.
    #[serde(with = "duration_millis")]
    pub lag_critical: Duration,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "pharos".to_string(),
            event_bus_capacity: 1024,
            max_metric_history: 1000,
            max_debug_events: 2000,
            max_traces: 500,
            trace_retention: Duration::from_secs(30 * 60),
            max_alerts: 500,
            health_check_interval: Duration::from_secs(30),
            diagnostics_interval: Duration::from_secs(60),
            metrics_push_interval: Duration::ZERO,
            export_interval: Duration::from_secs(60),
            max_retry_attempts: 3,
            retry_initial_backoff: Duration::from_millis(250),
            memory_warning_ratio: 0.85,
            memory_critical_ratio: 0.95,
            lag_warning: Duration::from_millis(100),
            lag_critical: Duration::from_millis(500),
        }
    }
}

impl ObservabilityConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> CommonResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| CommonError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot compose a working pipeline.
    pub fn validate(&self) -> CommonResult<()> {
        if self.service_name.is_empty() {
            return Err(CommonError::invalid_config("service_name must not be empty"));
        }
        if self.max_metric_history == 0 {
            return Err(CommonError::invalid_config("max_metric_history must be at least 1"));
        }
        if self.max_debug_events == 0 || self.max_traces == 0 || self.max_alerts == 0 {
            return Err(CommonError::invalid_config("retention bounds must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.memory_warning_ratio)
            || !(0.0..=1.0).contains(&self.memory_critical_ratio)
        {
            return Err(CommonError::invalid_config("memory ratios must be within [0, 1]"));
        }
        if self.memory_warning_ratio > self.memory_critical_ratio {
            return Err(CommonError::invalid_config(
                "memory_warning_ratio must not exceed memory_critical_ratio",
            ));
        }
        if self.lag_warning > self.lag_critical {
            return Err(CommonError::invalid_config(
                "lag_warning must not exceed lag_critical",
            ));
        }
        Ok(())
    }
}
