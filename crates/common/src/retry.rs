//! Bounded retry with configurable backoff.
//!
//! The telemetry exporter redelivers failed batches a configured number of
//! times before surfacing an export failure. This module provides the
//! backoff math and the retry loop; callers decide what exhaustion means.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{CommonError, CommonResult};

/// Backoff strategy for calculating the delay before the next attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between attempts.
    Fixed(Duration),
    /// Exponential backoff: `initial_delay * base^attempt`, capped at
    /// `max_delay`.
    Exponential {
        /// Delay before the first retry.
        initial_delay: Duration,
        /// Multiplier applied per attempt.
        base: f64,
        /// Upper bound on any single delay.
        max_delay: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate the delay preceding retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let millis = initial_delay.as_millis() as f64 * base.powi(attempt as i32);
                let capped = millis.min(max_delay.as_millis() as f64) as u64;
                Duration::from_millis(capped)
            }
        }
    }
}

/// Configuration for a bounded retry loop.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first. Zero is treated as
    /// one attempt.
    pub max_attempts: u32,
    /// Delay policy between attempts.
    pub backoff: BackoffStrategy,
}

impl RetryConfig {
    /// Exponential backoff doubling from `initial_delay`, capped at ten
    /// times the initial delay.
    pub fn exponential(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::Exponential {
                initial_delay,
                base: 2.0,
                max_delay: initial_delay.saturating_mul(10),
            },
        }
    }

    /// Fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, backoff: BackoffStrategy::Fixed(delay) }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(250))
    }
}

/// Run `operation` until it succeeds or `config.max_attempts` is exhausted.
///
/// The operation receives the 0-based attempt index. Failures between
/// attempts are logged at debug; exhaustion returns
/// [`CommonError::RetriesExhausted`] carrying the final error.
pub async fn retry_with_config<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> CommonResult<T>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation = operation_name, attempt, "Retry succeeded");
                }
                return Ok(value);
            }
            Err(err) => {
                last_error = err.to_string();
                if attempt + 1 < attempts {
                    let delay = config.backoff.delay_for(attempt);
                    debug!(
                        operation = operation_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %last_error,
                        "Attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    warn!(operation = operation_name, attempts, error = %last_error, "Retries exhausted");
    Err(CommonError::RetriesExhausted { attempts, last_error })
}
