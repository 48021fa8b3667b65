//! Metric registry: labeled time series, encoders, collectors, push.

pub mod encode;
pub mod registry;

use std::sync::Arc;

use pharos_common::CommonResult;
use pharos_domain::WireFormat;

use crate::ports::DeliverySink;

pub use registry::MetricRegistry;

/// Pluggable metric source invoked on every collection pass.
///
/// Collectors read their own data sources and record into the registry. A
/// failing collector is reported and skipped; it never aborts the pass.
pub trait MetricCollector: Send + Sync {
    /// Collector name, used in failure events.
    fn name(&self) -> &str;

    /// Record this collector's metrics into `registry`.
    fn collect(&self, registry: &MetricRegistry) -> CommonResult<()>;
}

/// External endpoint metric snapshots are pushed to.
#[derive(Clone)]
pub struct PushTarget {
    /// Unique target name.
    pub name: String,
    /// Encoding this target expects.
    pub format: WireFormat,
    /// Transport used to deliver the encoded snapshot.
    pub sink: Arc<dyn DeliverySink>,
}

impl PushTarget {
    /// Create a push target.
    pub fn new(name: impl Into<String>, format: WireFormat, sink: Arc<dyn DeliverySink>) -> Self {
        Self { name: name.into(), format, sink }
    }
}

impl std::fmt::Debug for PushTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushTarget")
            .field("name", &self.name)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
