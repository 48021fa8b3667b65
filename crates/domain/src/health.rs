//! Health check results and aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Status tier reported by a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthTier {
    /// Operating normally.
    Healthy,
    /// Degraded but functional.
    Warning,
    /// Failing.
    Critical,
    /// The check could not determine a status.
    Unknown,
}

impl HealthTier {
    /// Severity rank used for worst-of aggregation.
    ///
    /// `Unknown` outranks `Healthy` (something is unobservable) but sits
    /// below `Warning`.
    fn rank(self) -> u8 {
        match self {
            Self::Healthy => 0,
            Self::Unknown => 1,
            Self::Warning => 2,
            Self::Critical => 3,
        }
    }

    /// The worse of two tiers.
    pub fn worst(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

/// Outcome returned by a health probe: status tier, message, metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Reported tier.
    pub status: HealthTier,
    /// Human-readable detail.
    pub message: String,
    /// Structured detail (thresholds, measured values, error text).
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl CheckOutcome {
    /// A healthy outcome.
    pub fn healthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthTier::Healthy, message)
    }

    /// A warning outcome.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_status(HealthTier::Warning, message)
    }

    /// A critical outcome.
    pub fn critical(message: impl Into<String>) -> Self {
        Self::with_status(HealthTier::Critical, message)
    }

    /// An unknown outcome.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::with_status(HealthTier::Unknown, message)
    }

    /// An outcome with an explicit tier.
    pub fn with_status(status: HealthTier, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), metadata: BTreeMap::new() }
    }

    /// Attach one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Stored result of one health-check run. One result per check name,
/// overwritten on each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Check name.
    pub name: String,
    /// Check category (e.g. "system", "runtime").
    pub category: String,
    /// Reported tier.
    pub status: HealthTier,
    /// Human-readable detail.
    pub message: String,
    /// When the check last ran, milliseconds since the UNIX epoch.
    pub checked_at_ms: u64,
    /// How long the probe took.
    pub duration_ms: u64,
    /// Structured detail.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Aggregated view over all current check results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallHealth {
    /// Worst-of tier across all checks; `Healthy` when no checks exist.
    pub overall: HealthTier,
    /// Current result per check, keyed by name.
    pub checks: BTreeMap<String, HealthCheckResult>,
}

impl OverallHealth {
    /// Aggregate a result set into an overall tier.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = HealthCheckResult>,
    {
        let mut checks = BTreeMap::new();
        let mut overall = HealthTier::Healthy;
        for result in results {
            overall = overall.worst(result.status);
            checks.insert(result.name.clone(), result);
        }
        Self { overall, checks }
    }

    /// Number of checks currently at [`HealthTier::Critical`].
    pub fn critical_count(&self) -> usize {
        self.checks.values().filter(|c| c.status == HealthTier::Critical).count()
    }
}
