//! The instrumentation seam.
//!
//! Request-handling code calls [`ObservabilityFacade::instrument_request`]
//! at the start of every unit of work and invokes the returned guard's
//! `finish` on completion. The guard finishes itself on drop, so an unwind
//! or early return still settles the span and the terminal counters exactly
//! once.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use pharos_common::Clock;
use pharos_core::{MetricRegistry, TraceRecorder};
use pharos_domain::{DebugLevel, Labels};
use uuid::Uuid;

use crate::facade::ObservabilityFacade;

/// Status label recorded when a request is opened.
const STATUS_STARTED: &str = "started";

/// Error message recorded when a guard is dropped without an explicit
/// finish.
const DROPPED_MESSAGE: &str = "request dropped without explicit finish";

/// Live instrumentation for one unit of work.
///
/// `finish` must be invoked exactly once on every exit path; the guard's
/// `Drop` enforces the contract by finishing with an error status when the
/// caller never did.
#[must_use = "finish the guard to settle the span and terminal metrics"]
pub struct RequestGuard {
    registry: Arc<MetricRegistry>,
    recorder: Arc<TraceRecorder>,
    clock: Arc<dyn Clock>,
    trace_id: String,
    span_id: Option<String>,
    counter: String,
    histogram: String,
    category: &'static str,
    base_labels: Labels,
    started: Instant,
    finished: bool,
}

impl RequestGuard {
    /// Trace opened for this unit of work.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Span opened for this unit of work.
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    /// Finish the unit of work: close the span, record the duration
    /// histogram, increment the terminal status counter, and log a
    /// correlated completion event.
    pub fn finish(mut self, error: Option<&str>, response_meta: BTreeMap<String, String>) {
        self.complete(error, response_meta);
    }

    fn complete(&mut self, error: Option<&str>, response_meta: BTreeMap<String, String>) {
        if self.finished {
            return;
        }
        self.finished = true;

        if let Some(span_id) = &self.span_id {
            self.recorder
                .finish_span(&self.trace_id, span_id, error, response_meta.clone());
        }

        let duration_seconds = self.clock.now().duration_since(self.started).as_secs_f64();
        self.registry
            .record_histogram(&self.histogram, duration_seconds, self.base_labels.clone());

        let status = if error.is_some() { "error" } else { "success" };
        let mut terminal_labels = self.base_labels.clone();
        terminal_labels.insert("status".to_string(), status.to_string());
        self.registry.increment_counter(&self.counter, 1.0, terminal_labels);

        let mut context = response_meta;
        context.insert("status".to_string(), status.to_string());
        context.insert(
            "duration_ms".to_string(),
            format!("{}", (duration_seconds * 1000.0) as u64),
        );
        if let Some(message) = error {
            context.insert("error".to_string(), message.to_string());
        }
        let level = if error.is_some() { DebugLevel::Error } else { DebugLevel::Info };
        self.recorder.log_event(
            level,
            self.category,
            format!("{status}: {}", self.describe()),
            context,
            "instrumentation",
            Some(&self.trace_id),
            self.span_id.as_deref(),
        );
    }

    fn describe(&self) -> String {
        self.base_labels
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.complete(Some(DROPPED_MESSAGE), BTreeMap::new());
        }
    }
}

impl std::fmt::Debug for RequestGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGuard")
            .field("trace_id", &self.trace_id)
            .field("span_id", &self.span_id)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl ObservabilityFacade {
    /// Instrument one inbound request.
    ///
    /// Opens a trace and span, counts the request as `status="started"`,
    /// and returns the guard whose `finish` settles the terminal metrics.
    pub fn instrument_request(
        &self,
        method: &str,
        subject: &str,
        metadata: BTreeMap<String, String>,
    ) -> RequestGuard {
        let prefix = self.metric_prefix();
        let mut base_labels = Labels::new();
        base_labels.insert("method".to_string(), method.to_string());
        base_labels.insert("subject".to_string(), subject.to_string());

        self.open_guard(
            format!("{method} {subject}"),
            metadata,
            format!("{prefix}_requests_total"),
            format!("{prefix}_request_duration_seconds"),
            "request",
            base_labels,
        )
    }

    /// Instrument one outbound upstream API call.
    pub fn instrument_api_call(
        &self,
        service: &str,
        endpoint: &str,
        subject: &str,
    ) -> RequestGuard {
        let prefix = self.metric_prefix();
        let mut base_labels = Labels::new();
        base_labels.insert("service".to_string(), service.to_string());
        base_labels.insert("endpoint".to_string(), endpoint.to_string());
        base_labels.insert("subject".to_string(), subject.to_string());

        self.open_guard(
            format!("{service} {endpoint}"),
            BTreeMap::new(),
            format!("{prefix}_upstream_requests_total"),
            format!("{prefix}_upstream_request_duration_seconds"),
            "upstream",
            base_labels,
        )
    }

    fn open_guard(
        &self,
        operation: String,
        metadata: BTreeMap<String, String>,
        counter: String,
        histogram: String,
        category: &'static str,
        base_labels: Labels,
    ) -> RequestGuard {
        let trace_id = Uuid::new_v4().to_string();
        self.recorder().start_trace(&trace_id, metadata.clone());
        let span_id = self.recorder().start_span(&trace_id, operation, None, metadata);

        let mut started_labels = base_labels.clone();
        started_labels.insert("status".to_string(), STATUS_STARTED.to_string());
        self.metrics().increment_counter(&counter, 1.0, started_labels);

        RequestGuard {
            registry: self.metrics().clone(),
            recorder: self.recorder().clone(),
            clock: self.clock().clone(),
            trace_id,
            span_id,
            counter,
            histogram,
            category,
            base_labels,
            started: self.clock().now(),
            finished: false,
        }
    }
}
