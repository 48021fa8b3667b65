//! Outbound delivery sinks.

pub mod http;
pub mod statsd;

pub use http::HttpDeliverySink;
pub use statsd::StatsdDeliverySink;
