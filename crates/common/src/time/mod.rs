//! Time primitives: clock abstraction and cancellable tickers.
//!
//! Recording paths stamp samples and events through a [`Clock`] so tests
//! can drive time deterministically with [`MockClock`]; periodic work runs
//! on a [`Ticker`] whose handle makes shutdown explicit and idempotent.

pub mod clock;
pub mod ticker;

pub use clock::{Clock, MockClock, SystemClock};
pub use ticker::{Ticker, TickerHandle};
