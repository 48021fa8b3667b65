//! Typed payload carried on the observability event bus.

use crate::alerts::Alert;
use crate::trace::DebugEvent;

/// Events published by pipeline components and consumed by the facade's
/// wiring (and any other subscriber registered at composition time).
#[derive(Debug, Clone)]
pub enum ObservabilityEvent {
    /// A metric sample was recorded.
    MetricRecorded {
        /// Metric name.
        name: String,
        /// Recorded value.
        value: f64,
    },
    /// A debug event entered the recorder.
    DebugEventLogged(DebugEvent),
    /// An alert rule triggered.
    AlertTriggered(Alert),
    /// A registered metric collector failed one pass.
    CollectorFailed {
        /// Collector name.
        collector: String,
        /// Stringified failure.
        error: String,
    },
    /// One push-target delivery settled.
    PushCompleted {
        /// Push target name.
        target: String,
        /// Whether delivery succeeded.
        success: bool,
        /// Failure detail when it did not.
        error: Option<String>,
    },
    /// A telemetry export destination was delivered to.
    ExportSucceeded {
        /// Destination name.
        destination: String,
        /// Wall time for the delivery.
        duration_ms: u64,
    },
    /// A telemetry export destination exhausted its retries.
    ExportFailed {
        /// Destination name.
        destination: String,
        /// Final error.
        error: String,
    },
}

impl ObservabilityEvent {
    /// Topic name, used for logging and test assertions.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::MetricRecorded { .. } => "metricRecorded",
            Self::DebugEventLogged(_) => "debugEventLogged",
            Self::AlertTriggered(_) => "alertTriggered",
            Self::CollectorFailed { .. } => "collectorFailed",
            Self::PushCompleted { .. } => "pushCompleted",
            Self::ExportSucceeded { .. } => "exportSuccess",
            Self::ExportFailed { .. } => "exportError",
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for event payloads.
    use super::*;

    /// Validates topic names stay stable; the facade wiring matches on them
    /// in log output.
    #[test]
    fn test_topic_names() {
        let event = ObservabilityEvent::MetricRecorded { name: "m".to_string(), value: 1.0 };
        assert_eq!(event.topic(), "metricRecorded");

        let event = ObservabilityEvent::ExportFailed {
            destination: "d".to_string(),
            error: "e".to_string(),
        };
        assert_eq!(event.topic(), "exportError");
    }
}
