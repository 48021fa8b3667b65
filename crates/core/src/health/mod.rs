//! Health checks, system diagnostics, and alerting.

pub mod alerts;
pub mod builtin;
pub mod engine;

use async_trait::async_trait;
use pharos_common::CommonResult;
use pharos_domain::CheckOutcome;

pub use alerts::{AlertContext, AlertRule};
pub use builtin::{memory_pressure_rule, runtime_lag_rule, MemoryUsageCheck, RuntimeLagCheck};
pub use engine::HealthEngine;

/// A named asynchronous health probe.
///
/// Probes report a status/message/metadata triple. Returning an `Err` is
/// equivalent to a critical outcome: the engine converts it rather than
/// propagating, so a broken probe can never crash a run.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Unique check name. Results are keyed and overwritten by this name.
    fn name(&self) -> &str;

    /// Check category used for grouping in reports.
    fn category(&self) -> &str {
        "general"
    }

    /// Execute the probe once.
    async fn execute(&self) -> CommonResult<CheckOutcome>;
}
