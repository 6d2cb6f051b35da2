//! Error types for the SMTP client.

use std::io;

use thiserror::Error;

/// Errors that can occur while driving an SMTP submission.
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error during network operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An operation did not complete within its timeout.
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// The server answered an error or unexpected status code.
    #[error("SMTP reply {code}: {message}")]
    Reply { code: u16, message: String },

    /// Could not parse a server reply.
    #[error("Failed to parse SMTP reply: {0}")]
    Parse(String),

    /// TLS negotiation failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The connection was closed mid-exchange.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
