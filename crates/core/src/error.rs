// Central error type for the Convoy core.

use thiserror::Error;

/// Library-level error type for the queue state machine and its ports.
#[derive(Error, Debug)]
pub enum ConvoyError {
    #[error("kv store error: {0}")]
    Kv(String),

    #[error("invalid queue option: {0}")]
    InvalidOption(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using ConvoyError.
pub type Result<T> = std::result::Result<T, ConvoyError>;
