//! Bridge error types

use contracts::ContractError;
use ingestion::IngestionError;
use thiserror::Error;

/// Bridge lifecycle errors
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Invalid configuration; the only fatal error, raised before any
    /// subscription or publisher exists
    #[error("configuration error: {0}")]
    Config(#[from] ContractError),

    /// Publisher could not be advertised
    #[error("bus error: {0}")]
    Bus(#[from] bus::BusError),

    /// Input subscription failed
    #[error("ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    /// `start` called outside a tokio runtime
    #[error("bridge must be started from within a tokio runtime")]
    NoRuntime,

    /// Operation not allowed in the current lifecycle state
    #[error("bridge is {state}, cannot {operation}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },
}

impl BridgeError {
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(e) if e.is_config_error())
    }
}

/// Bridge Result type alias
pub type Result<T> = std::result::Result<T, BridgeError>;
