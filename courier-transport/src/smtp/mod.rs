//! Asynchronous SMTP submission client and the relay provider adapter.
//!
//! Relays are authenticated submission endpoints with fixed addresses, so
//! the exchange is: connect → greeting → EHLO → STARTTLS upgrade →
//! AUTH LOGIN → MAIL FROM → RCPT TO → DATA → QUIT, every step bounded by
//! an operation timeout.

mod client;
mod error;
mod relay;
mod reply;

pub use client::SmtpClient;
pub use error::{ClientError, Result};
pub use relay::{RelayTimeouts, SmtpRelayTransport};
pub use reply::{Reply, ReplyLine};
