//! Platform probes for system diagnostics.

pub mod system;

pub use system::SysinfoProbe;
