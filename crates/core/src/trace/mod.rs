//! Trace/span lifecycle tracking and the structured debug-event buffer.

pub mod recorder;

pub use recorder::{StreamingConnection, TraceRecorder};
