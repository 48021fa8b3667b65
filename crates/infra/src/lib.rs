//! Adapters for the Pharos observability pipeline.
//!
//! Implementations of the `pharos-core` port traits plus the telemetry
//! exporter engine:
//! - [`delivery`]: HTTP and StatsD delivery sinks
//! - [`probes`]: sysinfo-backed system statistics
//! - [`collectors`]: built-in metric collectors
//! - [`exporter`]: batch export with bounded retry

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod collectors;
pub mod delivery;
pub mod exporter;
pub mod probes;

// Re-export commonly used types for convenience
pub use collectors::SystemMetricsCollector;
pub use delivery::{HttpDeliverySink, StatsdDeliverySink};
pub use exporter::{ExportDestination, TelemetryExporter};
pub use probes::SysinfoProbe;
