//! Cancellable recurring tickers.
//!
//! Every periodic task in the pipeline (metrics push, health runs,
//! diagnostics collection, batch export) runs on a [`Ticker`]. Each tick is
//! fire-and-forget: the callback owns its own error handling, the period is
//! fixed, and there is no catch-up for missed ticks. Cancellation through
//! the returned handle is idempotent and does not abort a tick already in
//! flight.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// Handle used to stop a running ticker.
#[derive(Debug, Clone)]
pub struct TickerHandle {
    name: &'static str,
    cancelled: Arc<AtomicBool>,
}

impl TickerHandle {
    fn new(name: &'static str) -> Self {
        Self { name, cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Stop the ticker. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!(ticker = self.name, "Ticker cancelled");
        }
    }

    /// Whether the ticker has been stopped (or was never started).
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Name the ticker was spawned with.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Spawner for recurring background work.
pub struct Ticker;

impl Ticker {
    /// Spawn a recurring task firing every `period`.
    ///
    /// The first tick happens one full period after spawning. A zero
    /// `period` disables the ticker entirely: no task is spawned and the
    /// returned handle reports cancelled.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> TickerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = TickerHandle::new(name);

        if period.is_zero() {
            handle.cancel();
            debug!(ticker = name, "Ticker disabled (zero period)");
            return handle;
        }

        let task_handle = handle.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await; // first tick resolves immediately

            while !task_handle.is_cancelled() {
                interval.tick().await;
                if task_handle.is_cancelled() {
                    break;
                }
                tick().await;
            }
        });

        handle
    }
}
