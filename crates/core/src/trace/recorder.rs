//! The trace/debug recorder.
//!
//! Tracks trace and span lifecycles, keeps a bounded most-recent-first
//! buffer of structured debug events, and fans events out to push-based
//! streaming subscriptions. Recording never blocks on a subscriber and
//! never fails the caller: finishing an unknown span is a warning, not an
//! error.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use pharos_common::Clock;
use pharos_domain::{
    DebugEvent, DebugLevel, ObservabilityEvent, Span, SpanStatus, StreamFilter, Trace,
};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::config::ObservabilityConfig;
use crate::ObservabilityBus;

/// Per-subscriber delivery buffer size. A subscriber further behind than
/// this starts losing events rather than slowing the recorder.
const STREAM_BUFFER: usize = 64;

/// One push-based subscription to the debug-event stream.
pub struct StreamingConnection {
    filter: StreamFilter,
    sender: mpsc::Sender<DebugEvent>,
}

/// Records trace/span lifecycles and structured debug events.
pub struct TraceRecorder {
    clock: Arc<dyn Clock>,
    bus: ObservabilityBus,
    max_events: usize,
    max_traces: usize,
    trace_retention: Duration,
    traces: RwLock<TraceStore>,
    events: RwLock<VecDeque<DebugEvent>>,
    streams: RwLock<HashMap<String, StreamingConnection>>,
}

/// Trace map plus insertion order for count-based pruning.
#[derive(Default)]
struct TraceStore {
    by_id: HashMap<String, Trace>,
    order: VecDeque<String>,
}

impl TraceRecorder {
    /// Create a recorder from pipeline configuration.
    pub fn new(config: &ObservabilityConfig, clock: Arc<dyn Clock>, bus: ObservabilityBus) -> Self {
        Self {
            clock,
            bus,
            max_events: config.max_debug_events.max(1),
            max_traces: config.max_traces.max(1),
            trace_retention: config.trace_retention,
            traces: RwLock::new(TraceStore::default()),
            events: RwLock::new(VecDeque::new()),
            streams: RwLock::new(HashMap::new()),
        }
    }

    // ========================================================================
    // Traces & spans
    // ========================================================================

    /// Create a trace. Re-creating an existing id is a warning no-op.
    pub fn start_trace(&self, trace_id: impl Into<String>, metadata: BTreeMap<String, String>) {
        let trace_id = trace_id.into();
        let now = self.clock.now_millis();
        let mut store = self.traces.write();

        if store.by_id.contains_key(&trace_id) {
            warn!(trace_id = %trace_id, "Trace already exists, ignoring start");
            return;
        }

        store.by_id.insert(
            trace_id.clone(),
            Trace { trace_id: trace_id.clone(), metadata, started_at_ms: now, spans: Vec::new() },
        );
        store.order.push_back(trace_id);
        Self::prune(&mut store, now, self.max_traces, self.trace_retention);
    }

    /// Open a span under an existing trace. Returns the new span id, or
    /// `None` (with a warning) when the trace is unknown.
    pub fn start_span(
        &self,
        trace_id: &str,
        operation: impl Into<String>,
        parent_span_id: Option<&str>,
        tags: BTreeMap<String, String>,
    ) -> Option<String> {
        let now = self.clock.now_millis();
        let mut store = self.traces.write();
        let Some(trace) = store.by_id.get_mut(trace_id) else {
            warn!(trace_id = %trace_id, "Span started on unknown trace, ignoring");
            return None;
        };

        let span_id = Uuid::new_v4().to_string();
        trace.spans.push(Span {
            span_id: span_id.clone(),
            trace_id: trace_id.to_string(),
            parent_span_id: parent_span_id.map(ToString::to_string),
            operation: operation.into(),
            started_at_ms: now,
            finished_at_ms: None,
            tags,
            status: SpanStatus::Ok,
        });
        Some(span_id)
    }

    /// Finish an open span, optionally marking it failed and merging extra
    /// tags. Unknown trace/span ids and double finishes are warning no-ops.
    pub fn finish_span(
        &self,
        trace_id: &str,
        span_id: &str,
        error: Option<&str>,
        tags: BTreeMap<String, String>,
    ) {
        let now = self.clock.now_millis();
        let mut store = self.traces.write();
        let Some(trace) = store.by_id.get_mut(trace_id) else {
            warn!(trace_id = %trace_id, span_id = %span_id, "Finished span on unknown trace, ignoring");
            return;
        };
        let Some(span) = trace.spans.iter_mut().find(|s| s.span_id == span_id) else {
            warn!(trace_id = %trace_id, span_id = %span_id, "Finished unknown span, ignoring");
            return;
        };
        if span.finished_at_ms.is_some() {
            warn!(trace_id = %trace_id, span_id = %span_id, "Span already finished, ignoring");
            return;
        }

        // saturating duration keeps finish >= start even under clock skew
        span.finished_at_ms = Some(now.max(span.started_at_ms));
        span.tags.extend(tags);
        if let Some(message) = error {
            span.status = SpanStatus::Error;
            span.tags.insert("error".to_string(), message.to_string());
        }
    }

    /// The `n` most recently created traces, newest first.
    pub fn recent_traces(&self, n: usize) -> Vec<Trace> {
        let store = self.traces.read();
        store
            .order
            .iter()
            .rev()
            .take(n)
            .filter_map(|id| store.by_id.get(id).cloned())
            .collect()
    }

    /// Fetch one trace by id.
    pub fn trace(&self, trace_id: &str) -> Option<Trace> {
        self.traces.read().by_id.get(trace_id).cloned()
    }

    /// Total spans still open across all retained traces.
    pub fn open_span_count(&self) -> usize {
        self.traces.read().by_id.values().map(Trace::open_span_count).sum()
    }

    fn prune(store: &mut TraceStore, now_ms: u64, max_traces: usize, retention: Duration) {
        let retention_ms = retention.as_millis() as u64;
        while store.order.len() > max_traces {
            if let Some(evicted) = store.order.pop_front() {
                store.by_id.remove(&evicted);
            }
        }
        if retention_ms > 0 {
            while let Some(oldest_id) = store.order.front() {
                let expired = store
                    .by_id
                    .get(oldest_id)
                    .is_some_and(|t| now_ms.saturating_sub(t.started_at_ms) > retention_ms);
                if !expired {
                    break;
                }
                if let Some(evicted) = store.order.pop_front() {
                    store.by_id.remove(&evicted);
                }
            }
        }
    }

    // ========================================================================
    // Debug events
    // ========================================================================

    /// Append a structured debug event and broadcast it.
    ///
    /// The event lands in the bounded buffer, on the observability bus, and
    /// on every matching streaming connection. Stream delivery is
    /// best-effort `try_send`: a slow or closed subscriber never blocks
    /// recording or the other subscribers.
    #[allow(clippy::too_many_arguments)]
    pub fn log_event(
        &self,
        level: DebugLevel,
        category: impl Into<String>,
        message: impl Into<String>,
        context: BTreeMap<String, String>,
        source: impl Into<String>,
        trace_id: Option<&str>,
        span_id: Option<&str>,
    ) -> DebugEvent {
        let event = DebugEvent {
            timestamp_ms: self.clock.now_millis(),
            level,
            category: category.into(),
            message: message.into(),
            context,
            source: source.into(),
            trace_id: trace_id.map(ToString::to_string),
            span_id: span_id.map(ToString::to_string),
        };

        {
            let mut events = self.events.write();
            events.push_back(event.clone());
            while events.len() > self.max_events {
                events.pop_front();
            }
        }

        self.broadcast_to_streams(&event);
        self.bus.publish(ObservabilityEvent::DebugEventLogged(event.clone()));
        event
    }

    /// The `n` most recent debug events, newest first.
    pub fn recent_events(&self, n: usize) -> Vec<DebugEvent> {
        self.events.read().iter().rev().take(n).cloned().collect()
    }

    // ========================================================================
    // Streaming subscriptions
    // ========================================================================

    /// Open a filtered push-based subscription to the debug-event stream.
    ///
    /// Returns the connection id (for [`close_streaming_connection`]) and
    /// the receiving half. Dropping the receiver closes the connection
    /// implicitly on the next delivery attempt.
    ///
    /// [`close_streaming_connection`]: Self::close_streaming_connection
    pub fn add_streaming_connection(
        &self,
        filter: StreamFilter,
    ) -> (String, mpsc::Receiver<DebugEvent>) {
        let (sender, receiver) = mpsc::channel(STREAM_BUFFER);
        let id = Uuid::new_v4().to_string();
        self.streams
            .write()
            .insert(id.clone(), StreamingConnection { filter, sender });
        (id, receiver)
    }

    /// Close a streaming connection. Returns whether it existed.
    pub fn close_streaming_connection(&self, connection_id: &str) -> bool {
        self.streams.write().remove(connection_id).is_some()
    }

    /// Number of open streaming connections.
    pub fn streaming_connection_count(&self) -> usize {
        self.streams.read().len()
    }

    fn broadcast_to_streams(&self, event: &DebugEvent) {
        let mut closed: Vec<String> = Vec::new();
        {
            let streams = self.streams.read();
            for (id, connection) in streams.iter() {
                if !connection.filter.matches(event) {
                    continue;
                }
                match connection.sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // Subscriber lagging; drop this event for it.
                        warn!(connection = %id, "Streaming subscriber full, dropping event");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        closed.push(id.clone());
                    }
                }
            }
        }
        if !closed.is_empty() {
            let mut streams = self.streams.write();
            for id in closed {
                streams.remove(&id);
            }
        }
    }
}

impl std::fmt::Debug for TraceRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceRecorder")
            .field("traces", &self.traces.read().by_id.len())
            .field("events", &self.events.read().len())
            .field("streams", &self.streams.read().len())
            .finish_non_exhaustive()
    }
}
