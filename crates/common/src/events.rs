//! Typed in-process event bus.
//!
//! Components publish domain events (metric recorded, alert triggered,
//! export finished, ...) onto a broadcast channel; interested parties
//! subscribe at composition time. This replaces inheritance-based event
//! wiring with an explicit publish/subscribe seam.
//!
//! Delivery is best-effort: `tokio::sync::broadcast` drops the oldest
//! messages for a receiver that lags behind the channel capacity, so slow
//! subscribers must handle `RecvError::Lagged` and can never block a
//! publisher.

use tokio::sync::broadcast;

/// Default channel capacity when none is given.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process pub/sub bus carrying events of type `T`.
#[derive(Debug)]
pub struct EventBus<T> {
    tx: broadcast::Sender<T>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T: Clone> EventBus<T> {
    /// Create a bus with the provided channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all active subscribers.
    ///
    /// Returns the number of subscribers the event was delivered to. A bus
    /// with no subscribers swallows the event; publishing is always safe to
    /// call from any component.
    pub fn publish(&self, event: T) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to all future events from this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
