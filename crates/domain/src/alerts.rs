//! Alerts raised by rule evaluation.

use serde::{Deserialize, Serialize};

/// Severity of an alert rule and the alerts it raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Needs immediate attention.
    Critical,
}

impl AlertSeverity {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// One triggered alert, retained in a bounded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Opaque unique identifier.
    pub id: String,
    /// Name of the rule that triggered.
    pub rule: String,
    /// Severity inherited from the rule.
    pub severity: AlertSeverity,
    /// Message inherited from the rule.
    pub message: String,
    /// Trigger time, milliseconds since the UNIX epoch.
    pub timestamp_ms: u64,
    /// Snapshot of the data the predicate evaluated against.
    pub data: serde_json::Value,
    /// Whether an operator has acknowledged the alert.
    pub acknowledged: bool,
    /// Who acknowledged it.
    pub acknowledged_by: Option<String>,
    /// When it was acknowledged, milliseconds since the UNIX epoch.
    pub acknowledged_at_ms: Option<u64>,
}

/// Filter for querying the alert history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertFilter {
    /// Only alerts of this severity.
    pub severity: Option<AlertSeverity>,
    /// Only alerts with this acknowledgment state.
    pub acknowledged: Option<bool>,
    /// Only alerts triggered at or after this timestamp.
    pub since_ms: Option<u64>,
}

impl AlertFilter {
    /// Whether `alert` passes this filter.
    pub fn matches(&self, alert: &Alert) -> bool {
        if let Some(severity) = self.severity {
            if alert.severity != severity {
                return false;
            }
        }
        if let Some(acknowledged) = self.acknowledged {
            if alert.acknowledged != acknowledged {
                return false;
            }
        }
        if let Some(since) = self.since_ms {
            if alert.timestamp_ms < since {
                return false;
            }
        }
        true
    }
}
