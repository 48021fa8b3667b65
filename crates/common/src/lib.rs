//! Shared utilities for the Pharos observability pipeline.
//!
//! This crate holds the domain-free building blocks the rest of the
//! workspace composes:
//! - `error`: the shared [`CommonError`]/[`CommonResult`] types
//! - `events`: a typed broadcast bus for cross-component forwarding
//! - `retry`: backoff strategies and bounded retry execution
//! - `time`: clock abstraction (real and simulated) and cancellable tickers
//!
//! Nothing in here knows about metrics, traces, or health checks; those
//! live in `pharos-domain` and `pharos-core`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod error;
pub mod events;
pub mod retry;
pub mod time;
pub mod utils;

// Re-export commonly used types for convenience
pub use error::{CommonError, CommonResult};
pub use events::EventBus;
pub use retry::{retry_with_config, BackoffStrategy, RetryConfig};
pub use time::{Clock, MockClock, SystemClock, Ticker, TickerHandle};
