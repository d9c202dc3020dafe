//! Error types for PCQ

use thiserror::Error;

/// Result type alias for PCQ operations
pub type Result<T> = std::result::Result<T, PcqError>;

/// Main error type for PCQ
#[derive(Error, Debug)]
pub enum PcqError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
