//! Typed transport failures.
//!
//! Every variant is a fall-through as far as the provider chain is
//! concerned; the classification exists for logs, delivery-log rows, and
//! operator diagnostics.

use thiserror::Error;

use crate::smtp::ClientError;

/// A failure to hand a message to a transport provider.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the provider at all.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The provider did not answer within the operation timeout.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The provider rejected our credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The provider rejected this message or recipient.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The provider is up but refusing work (rate limited, busy, 5xx).
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// TLS negotiation failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The provider answered something we could not interpret.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The provider is misconfigured; no send was attempted.
    #[error("Invalid provider configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// Whether the failure concerns credentials rather than the message.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Categorize SMTP client failures.
///
/// - 4xx replies → the relay is temporarily refusing work
/// - 5xx replies → the relay rejected the message or recipient
/// - I/O and connection failures → connection errors
/// - parse failures → protocol errors
impl From<ClientError> for TransportError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Reply { code, message } if (400..500).contains(&code) => {
                Self::Unavailable(format!("{code} {message}"))
            }
            ClientError::Reply { code, message } => Self::Rejected(format!("{code} {message}")),
            ClientError::Io(e) => Self::Connection(format!("I/O error: {e}")),
            ClientError::ConnectionClosed => {
                Self::Connection("Connection closed unexpectedly".to_string())
            }
            ClientError::Timeout(what) => Self::Timeout(what),
            ClientError::Tls(message) => Self::Tls(message),
            ClientError::Parse(message) => Self::Protocol(message),
        }
    }
}
