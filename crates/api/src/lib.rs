//! Composition layer of the Pharos observability pipeline.
//!
//! [`ObservabilityFacade`] wires the metric registry, trace recorder,
//! health engine, and telemetry exporter together over the typed event bus
//! and exposes the single instrumentation seam request-handling code calls:
//!
//! ```no_run
//! use pharos_api::ObservabilityFacade;
//! use pharos_core::ObservabilityConfig;
//! use std::collections::BTreeMap;
//!
//! #[tokio::main]
//! async fn main() -> pharos_common::CommonResult<()> {
//!     let facade = ObservabilityFacade::new(ObservabilityConfig::default())?;
//!     facade.start();
//!
//!     let guard = facade.instrument_request("tool.call", "property.list", BTreeMap::new());
//!     // ... handle the request ...
//!     guard.finish(None, BTreeMap::new());
//!
//!     facade.stop();
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod facade;
pub mod instrument;
pub mod report;

// Re-export commonly used types for convenience
pub use facade::ObservabilityFacade;
pub use instrument::RequestGuard;
pub use report::HealthReport;
