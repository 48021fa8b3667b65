//! Metric definitions and samples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Label map attached to a sample.
///
/// A `BTreeMap` keeps label order deterministic, which the text exposition
/// format relies on.
pub type Labels = BTreeMap<String, String>;

/// Build a [`Labels`] map from string pairs.
pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

/// The kind of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically accumulating count.
    Counter,
    /// Point-in-time value that can move in either direction.
    Gauge,
    /// Raw observations with derived `_count`/`_sum` series.
    Histogram,
    /// Pre-aggregated distribution; accepted and exported, no quantile math.
    Summary,
}

impl MetricKind {
    /// Lowercase name used by the exposition formats.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Summary => "summary",
        }
    }
}

/// Registered shape of a metric: its unique name, kind, help text, and the
/// label names samples are expected to carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Unique metric name.
    pub name: String,
    /// Metric kind.
    pub kind: MetricKind,
    /// Help text emitted in the exposition format.
    pub help: String,
    /// Ordered label names this metric is recorded with.
    pub label_names: Vec<String>,
}

impl MetricDefinition {
    /// Create a definition with no labels.
    pub fn new(name: impl Into<String>, kind: MetricKind, help: impl Into<String>) -> Self {
        Self { name: name.into(), kind, help: help.into(), label_names: Vec::new() }
    }

    /// Set the expected label names.
    #[must_use]
    pub fn with_labels(mut self, label_names: &[&str]) -> Self {
        self.label_names = label_names.iter().map(|l| (*l).to_string()).collect();
        self
    }
}

/// One recorded observation of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Observed value.
    pub value: f64,
    /// Milliseconds since the UNIX epoch when the sample was recorded.
    pub timestamp_ms: u64,
    /// Labels the sample was recorded with.
    pub labels: Labels,
}

impl MetricSample {
    /// Create a sample.
    pub fn new(value: f64, timestamp_ms: u64, labels: Labels) -> Self {
        Self { value, timestamp_ms, labels }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for metrics types.
    use super::*;

    /// Validates the labels helper produces a sorted map.
    #[test]
    fn test_labels_helper_sorts_keys() {
        let l = labels(&[("method", "GET"), ("code", "200")]);
        let keys: Vec<_> = l.keys().cloned().collect();
        assert_eq!(keys, vec!["code".to_string(), "method".to_string()]);
    }

    /// Validates the definition builder carries labels through.
    #[test]
    fn test_definition_builder() {
        let def = MetricDefinition::new("requests_total", MetricKind::Counter, "Total requests")
            .with_labels(&["method", "subject"]);

        assert_eq!(def.name, "requests_total");
        assert_eq!(def.kind, MetricKind::Counter);
        assert_eq!(def.label_names, vec!["method", "subject"]);
    }

    /// Validates kind names match the exposition vocabulary.
    #[test]
    fn test_kind_names() {
        assert_eq!(MetricKind::Counter.as_str(), "counter");
        assert_eq!(MetricKind::Gauge.as_str(), "gauge");
        assert_eq!(MetricKind::Histogram.as_str(), "histogram");
        assert_eq!(MetricKind::Summary.as_str(), "summary");
    }
}
