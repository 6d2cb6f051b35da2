//! Error types for the control protocol.

use thiserror::Error;

/// Errors raised by the control server and client.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("Connection closed before a response arrived")]
    ConnectionClosed,

    /// The engine reported a failure executing the command.
    #[error("Server error: {0}")]
    ServerError(String),
}

/// Specialized `Result` type for control operations.
pub type Result<T> = std::result::Result<T, ControlError>;
