//! Point-in-time system diagnostics snapshots.
//!
//! Snapshots are immutable captures of process/OS resource stats. Probes
//! that a platform cannot serve report `None`/empty rather than failing the
//! whole snapshot.

use serde::{Deserialize, Serialize};

/// Machine and process memory statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Total physical memory in bytes.
    pub total_bytes: Option<u64>,
    /// Used physical memory in bytes.
    pub used_bytes: Option<u64>,
}

impl MemoryStats {
    /// Used/total ratio in `[0.0, 1.0]`, when both sides are known.
    pub fn used_ratio(&self) -> Option<f64> {
        match (self.used_bytes, self.total_bytes) {
            (Some(used), Some(total)) if total > 0 => Some(used as f64 / total as f64),
            _ => None,
        }
    }
}

/// CPU load statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    /// 1-minute load average.
    pub load_one: Option<f64>,
    /// 5-minute load average.
    pub load_five: Option<f64>,
    /// 15-minute load average.
    pub load_fifteen: Option<f64>,
    /// Instantaneous global CPU usage percentage.
    pub usage_percent: Option<f32>,
}

/// Statistics for the current process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    /// Process id.
    pub pid: Option<u32>,
    /// Resident memory in bytes.
    pub memory_bytes: Option<u64>,
    /// Process CPU usage percentage.
    pub cpu_percent: Option<f32>,
}

/// Cumulative counters for one network interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterfaceStats {
    /// Interface name.
    pub name: String,
    /// Total bytes received.
    pub received_bytes: u64,
    /// Total bytes transmitted.
    pub transmitted_bytes: u64,
}

/// Usage for one mounted disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStats {
    /// Mount point path.
    pub mount_point: String,
    /// Total capacity in bytes.
    pub total_bytes: u64,
    /// Available capacity in bytes.
    pub available_bytes: u64,
}

impl DiskStats {
    /// Used/total ratio in `[0.0, 1.0]`.
    pub fn used_ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes);
        used as f64 / self.total_bytes as f64
    }
}

/// Immutable point-in-time capture of system and process resource stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDiagnostics {
    /// Capture time, milliseconds since the UNIX epoch.
    pub captured_at_ms: u64,
    /// System uptime in seconds.
    pub uptime_secs: Option<u64>,
    /// Memory statistics.
    pub memory: MemoryStats,
    /// CPU statistics.
    pub cpu: CpuStats,
    /// Current process statistics.
    pub process: ProcessStats,
    /// Per-interface network counters; empty when unsupported.
    pub network: Vec<NetworkInterfaceStats>,
    /// Per-disk usage; empty when unsupported.
    pub disks: Vec<DiskStats>,
}

impl SystemDiagnostics {
    /// A snapshot with every probe reporting unknown.
    pub fn unknown(captured_at_ms: u64) -> Self {
        Self {
            captured_at_ms,
            uptime_secs: None,
            memory: MemoryStats::default(),
            cpu: CpuStats::default(),
            process: ProcessStats::default(),
            network: Vec::new(),
            disks: Vec::new(),
        }
    }
}
