//! MessageSink trait - consumer side of a bus topic
//!
//! Defines the abstract interface for sinks attached to output topics.

use crate::{BusMessage, ContractError};

/// Message consumer trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(MessageSink: Send)]
pub trait LocalMessageSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one message received on `topic`
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, topic: &str, message: &BusMessage) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
