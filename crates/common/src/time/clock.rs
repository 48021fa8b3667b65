//! Clock abstraction for testable time.
//!
//! All timestamping in the pipeline goes through a [`Clock`] reference so
//! cooldowns, retention windows, and durations can be tested without real
//! time passing.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Current monotonic instant, suitable for measuring durations.
    fn now(&self) -> Instant;

    /// Current wall-clock time.
    fn system_time(&self) -> SystemTime;

    /// Milliseconds since the UNIX epoch.
    ///
    /// All persisted timestamps in the pipeline (samples, events, spans,
    /// alerts) use this representation.
    fn now_millis(&self) -> u64 {
        self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Real system clock. Use in production composition.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Clones share the same simulated elapsed time, so a test can hand one
/// copy to the component under test and keep another to advance.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    base_system_time: SystemTime,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a mock clock anchored at the current real time.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            base_system_time: SystemTime::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance simulated time by `duration`.
    pub fn advance(&self, duration: Duration) {
        // Test utility: panic on a poisoned mutex to fail tests early
        let mut elapsed = self.elapsed.lock().expect("mock clock mutex poisoned");
        *elapsed += duration;
    }

    /// Advance simulated time by `millis` milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Total simulated time advanced since creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().expect("mock clock mutex poisoned")
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock().expect("mock clock mutex poisoned")
    }

    fn system_time(&self) -> SystemTime {
        self.base_system_time + *self.elapsed.lock().expect("mock clock mutex poisoned")
    }
}
