//! Pure data model for the Pharos observability pipeline.
//!
//! Everything in this crate is plain data: metric definitions and samples,
//! traces and spans, debug events, health results, alerts, diagnostics
//! snapshots, export outcomes, and the typed event-bus payload. Behavior
//! (registries, recorders, engines) lives in `pharos-core`; adapters live
//! in `pharos-infra`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod alerts;
pub mod diagnostics;
pub mod events;
pub mod export;
pub mod health;
pub mod metrics;
pub mod trace;

// Re-export commonly used types for convenience
pub use alerts::{Alert, AlertFilter, AlertSeverity};
pub use diagnostics::{
    CpuStats, DiskStats, MemoryStats, NetworkInterfaceStats, ProcessStats, SystemDiagnostics,
};
pub use events::ObservabilityEvent;
pub use export::{AuthConfig, ExportResult, ExporterStats, WireFormat};
pub use health::{CheckOutcome, HealthCheckResult, HealthTier, OverallHealth};
pub use metrics::{labels, Labels, MetricDefinition, MetricKind, MetricSample};
pub use trace::{DebugEvent, DebugLevel, Span, SpanStatus, StreamFilter, Trace};
