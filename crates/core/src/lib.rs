//! Engines of the Pharos observability pipeline.
//!
//! Three stateful components live here, each safe to call from any
//! concurrent call site:
//! - [`metrics::MetricRegistry`]: labeled time series with bounded
//!   history, pluggable collectors, and push fan-out
//! - [`trace::TraceRecorder`]: trace/span lifecycles, the bounded debug
//!   event buffer, and streaming subscriptions
//! - [`health::HealthEngine`]: async health probes, diagnostics
//!   snapshots, and cooldown-gated alert rules
//!
//! Outbound I/O and platform probing stay behind the port traits in
//! [`ports`]; implementations live in `pharos-infra`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod ports;
pub mod trace;

// Re-export commonly used types for convenience
pub use config::ObservabilityConfig;
pub use health::{AlertContext, AlertRule, HealthCheck, HealthEngine};
pub use metrics::{MetricCollector, MetricRegistry, PushTarget};
pub use ports::{DeliverySink, SystemProbe};
pub use trace::TraceRecorder;

/// Bus alias carrying the pipeline's typed events.
pub type ObservabilityBus = pharos_common::EventBus<pharos_domain::ObservabilityEvent>;
