//! Built-in metric collectors.

use std::sync::Arc;

use pharos_common::CommonResult;
use pharos_core::{MetricCollector, MetricRegistry, SystemProbe};
use pharos_domain::{labels, MetricDefinition, MetricKind};

/// Collector recording system gauges from the platform probe on every
/// collection pass.
pub struct SystemMetricsCollector {
    probe: Arc<dyn SystemProbe>,
}

impl SystemMetricsCollector {
    /// Create the collector.
    pub fn new(probe: Arc<dyn SystemProbe>) -> Self {
        Self { probe }
    }
}

impl MetricCollector for SystemMetricsCollector {
    fn name(&self) -> &str {
        "system_metrics"
    }

    fn collect(&self, registry: &MetricRegistry) -> CommonResult<()> {
        // Idempotent upserts keep the series exportable.
        registry.register_metric(MetricDefinition::new(
            "system_memory_used_bytes",
            MetricKind::Gauge,
            "Used physical memory",
        ));
        registry.register_metric(MetricDefinition::new(
            "system_memory_total_bytes",
            MetricKind::Gauge,
            "Total physical memory",
        ));
        registry.register_metric(MetricDefinition::new(
            "system_load_average_one",
            MetricKind::Gauge,
            "1-minute load average",
        ));
        registry.register_metric(MetricDefinition::new(
            "system_uptime_seconds",
            MetricKind::Gauge,
            "System uptime",
        ));
        registry.register_metric(MetricDefinition::new(
            "process_memory_bytes",
            MetricKind::Gauge,
            "Resident memory of this process",
        ));

        let snapshot = self.probe.snapshot(0);
        if let Some(used) = snapshot.memory.used_bytes {
            registry.set_gauge("system_memory_used_bytes", used as f64, labels(&[]));
        }
        if let Some(total) = snapshot.memory.total_bytes {
            registry.set_gauge("system_memory_total_bytes", total as f64, labels(&[]));
        }
        if let Some(load_one) = snapshot.cpu.load_one {
            registry.set_gauge("system_load_average_one", load_one, labels(&[]));
        }
        if let Some(uptime) = snapshot.uptime_secs {
            registry.set_gauge("system_uptime_seconds", uptime as f64, labels(&[]));
        }
        if let Some(process_memory) = snapshot.process.memory_bytes {
            registry.set_gauge("process_memory_bytes", process_memory as f64, labels(&[]));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for collectors.
    use pharos_common::{EventBus, MockClock};
    use pharos_core::ports::UnsupportedProbe;
    use pharos_core::ObservabilityConfig;
    use pharos_domain::{MemoryStats, SystemDiagnostics};

    use super::*;

    struct FixedProbe;

    impl SystemProbe for FixedProbe {
        fn snapshot(&self, captured_at_ms: u64) -> SystemDiagnostics {
            let mut snapshot = SystemDiagnostics::unknown(captured_at_ms);
            snapshot.memory =
                MemoryStats { total_bytes: Some(1000), used_bytes: Some(400) };
            snapshot.uptime_secs = Some(60);
            snapshot
        }
    }

    fn registry() -> MetricRegistry {
        MetricRegistry::new(
            &ObservabilityConfig::default(),
            Arc::new(MockClock::new()),
            EventBus::default(),
        )
    }

    #[test]
    fn test_collects_known_readings() {
        let registry = registry();
        let collector = SystemMetricsCollector::new(Arc::new(FixedProbe));
        collector.collect(&registry).expect("collect");

        assert_eq!(registry.latest_value("system_memory_used_bytes", &labels(&[])), Some(400.0));
        assert_eq!(registry.latest_value("system_uptime_seconds", &labels(&[])), Some(60.0));
        // Unknown readings record nothing.
        assert_eq!(registry.latest_value("system_load_average_one", &labels(&[])), None);
    }

    #[test]
    fn test_unknown_platform_records_nothing_but_succeeds() {
        let registry = registry();
        let collector = SystemMetricsCollector::new(Arc::new(UnsupportedProbe));
        collector.collect(&registry).expect("collect");
        assert_eq!(registry.latest_value("system_memory_used_bytes", &labels(&[])), None);
        // Definitions still registered so empty series export headers.
        assert!(registry.definition("system_memory_used_bytes").is_some());
    }
}
