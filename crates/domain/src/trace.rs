//! Traces, spans, and structured debug events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Terminal status of a finished span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    /// The unit of work completed normally.
    Ok,
    /// The unit of work finished with an error.
    Error,
}

/// A timed unit of work within a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Opaque span identifier.
    pub span_id: String,
    /// Trace this span belongs to.
    pub trace_id: String,
    /// Parent span, when nested.
    pub parent_span_id: Option<String>,
    /// Operation name.
    pub operation: String,
    /// Start time, milliseconds since the UNIX epoch.
    pub started_at_ms: u64,
    /// Finish time; `None` while the span is open.
    pub finished_at_ms: Option<u64>,
    /// Span tags.
    pub tags: BTreeMap<String, String>,
    /// Terminal status; `Ok` until finished with an error.
    pub status: SpanStatus,
}

impl Span {
    /// Span duration in milliseconds, `None` while the span is open.
    ///
    /// Clamped at zero so clock skew can never produce a negative duration.
    pub fn duration_ms(&self) -> Option<u64> {
        self.finished_at_ms.map(|finished| finished.saturating_sub(self.started_at_ms))
    }

    /// Whether the span has not been finished yet.
    pub fn is_open(&self) -> bool {
        self.finished_at_ms.is_none()
    }
}

/// A correlated group of spans for one logical operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Opaque trace identifier.
    pub trace_id: String,
    /// Caller-supplied metadata.
    pub metadata: BTreeMap<String, String>,
    /// Creation time, milliseconds since the UNIX epoch.
    pub started_at_ms: u64,
    /// Spans recorded under this trace.
    pub spans: Vec<Span>,
}

impl Trace {
    /// Number of spans still open.
    pub fn open_span_count(&self) -> usize {
        self.spans.iter().filter(|s| s.is_open()).count()
    }
}

/// Severity of a debug event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal operational events.
    Info,
    /// Unexpected but tolerated conditions.
    Warn,
    /// Failures.
    Error,
}

impl DebugLevel {
    /// Lowercase name used as a metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// A structured log event, optionally correlated to a trace/span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEvent {
    /// Milliseconds since the UNIX epoch.
    pub timestamp_ms: u64,
    /// Event severity.
    pub level: DebugLevel,
    /// Event category (e.g. "request", "alerts", "export").
    pub category: String,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: BTreeMap<String, String>,
    /// Emitting component.
    pub source: String,
    /// Correlated trace, when any.
    pub trace_id: Option<String>,
    /// Correlated span, when any.
    pub span_id: Option<String>,
}

/// Filter applied to a streaming debug-event subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFilter {
    /// Deliver only events at or above this level.
    pub min_level: Option<DebugLevel>,
    /// Deliver only events in these categories. Empty/`None` means all.
    pub categories: Option<Vec<String>>,
}

impl StreamFilter {
    /// A filter that matches every event.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether `event` passes this filter.
    pub fn matches(&self, event: &DebugEvent) -> bool {
        if let Some(min) = self.min_level {
            if event.level < min {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            if !categories.is_empty() && !categories.iter().any(|c| c == &event.category) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for trace types.
    use super::*;

    fn event(level: DebugLevel, category: &str) -> DebugEvent {
        DebugEvent {
            timestamp_ms: 1,
            level,
            category: category.to_string(),
            message: String::new(),
            context: BTreeMap::new(),
            source: "test".to_string(),
            trace_id: None,
            span_id: None,
        }
    }

    /// Validates duration clamps to zero rather than going negative.
    #[test]
    fn test_span_duration_clamps() {
        let span = Span {
            span_id: "s".to_string(),
            trace_id: "t".to_string(),
            parent_span_id: None,
            operation: "op".to_string(),
            started_at_ms: 100,
            finished_at_ms: Some(40),
            tags: BTreeMap::new(),
            status: SpanStatus::Ok,
        };
        assert_eq!(span.duration_ms(), Some(0));
    }

    /// Validates open spans report no duration.
    #[test]
    fn test_open_span_has_no_duration() {
        let span = Span {
            span_id: "s".to_string(),
            trace_id: "t".to_string(),
            parent_span_id: None,
            operation: "op".to_string(),
            started_at_ms: 100,
            finished_at_ms: None,
            tags: BTreeMap::new(),
            status: SpanStatus::Ok,
        };
        assert!(span.is_open());
        assert_eq!(span.duration_ms(), None);
    }

    /// Validates level ordering used by stream filters.
    #[test]
    fn test_level_ordering() {
        assert!(DebugLevel::Debug < DebugLevel::Info);
        assert!(DebugLevel::Info < DebugLevel::Warn);
        assert!(DebugLevel::Warn < DebugLevel::Error);
    }

    /// Validates filtering by minimum level and category set.
    #[test]
    fn test_stream_filter() {
        let filter = StreamFilter {
            min_level: Some(DebugLevel::Warn),
            categories: Some(vec!["request".to_string()]),
        };

        assert!(filter.matches(&event(DebugLevel::Error, "request")));
        assert!(!filter.matches(&event(DebugLevel::Info, "request")));
        assert!(!filter.matches(&event(DebugLevel::Error, "export")));
        assert!(StreamFilter::any().matches(&event(DebugLevel::Debug, "anything")));
    }
}
