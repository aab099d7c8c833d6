//! Bus error types

use thiserror::Error;

/// Bus-specific errors
///
/// All variants are publish-side failures; none of them is fatal to the bridge.
#[derive(Debug, Error)]
pub enum BusError {
    /// One or more subscriber queues were full, message dropped for them
    #[error("queue full on topic '{topic}', message dropped for {dropped} subscriber(s)")]
    QueueFull { topic: String, dropped: usize },

    /// Publisher was already closed
    #[error("publisher for topic '{topic}' is closed")]
    PublisherClosed { topic: String },

    /// Bus was shut down
    #[error("bus is shut down")]
    BusClosed,
}

impl BusError {
    /// Whether the message reached none of the subscribers because of back-pressure
    pub fn is_queue_full(&self) -> bool {
        matches!(self, Self::QueueFull { .. })
    }
}
