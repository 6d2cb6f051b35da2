//! Transport adapters and provider failover for outbound delivery.
//!
//! Each provider kind exposes the same contract — send one message to one
//! recipient — behind the [`Transport`] trait, isolating protocol
//! differences (an HTTP request/response vs. a full SMTP submission
//! exchange) from the dispatcher. [`ProviderChain`] tries enabled providers
//! in ascending priority order until one accepts the message.

pub mod chain;
pub mod error;
pub mod http;
pub mod message;
pub mod smtp;

use async_trait::async_trait;

pub use chain::{ChainError, Delivery, ProviderChain, ProviderTransport, TransportConfig};
pub use error::TransportError;
pub use http::HttpApiTransport;
pub use message::OutboundMessage;
pub use smtp::SmtpRelayTransport;

/// Uniform send contract all provider adapters implement.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Provider name, recorded in delivery logs as `provider_used`.
    fn name(&self) -> &str;

    /// Deliver a single message to a single recipient.
    ///
    /// # Errors
    /// Any [`TransportError`] is treated by the chain as fall-through to
    /// the next provider; the same provider is never retried for the same
    /// message.
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}
