//! Error types for the ecfan system

use thiserror::Error;

/// Core error type for ecfan operations
#[derive(Error, Debug)]
pub enum EcfanError {
    /// EC communication errors (timeout, protocol violation, device I/O)
    #[error("EC error: {0}")]
    Ec(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Fan ID out of range
    #[error("Invalid fan ID: {0} (must be 1-3)")]
    InvalidFanId(u8),

    /// Fan level out of range
    #[error("Invalid fan level: {0} (must be 0-5)")]
    InvalidLevel(i64),

    /// Unrecognized fan or power mode
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    /// Configuration write failure (state already applied to hardware)
    #[error("Persist error: {0}")]
    Persist(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ecfan operations
pub type Result<T> = std::result::Result<T, EcfanError>;

impl From<serde_json::Error> for EcfanError {
    fn from(err: serde_json::Error) -> Self {
        EcfanError::Config(err.to_string())
    }
}
