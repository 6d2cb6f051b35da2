//! Ordered provider failover.

use std::time::Duration;

use async_trait::async_trait;
use courier_common::provider::{Provider, ProviderCredentials};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    HttpApiTransport, OutboundMessage, SmtpRelayTransport, Transport, TransportError,
    smtp::RelayTimeouts,
};

/// Transport-level settings shared by every provider adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Request-level timeout for HTTP API providers.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// SMTP relay operation timeouts.
    #[serde(default)]
    pub relay: RelayTimeouts,

    /// Accept invalid TLS certificates on relays (testing only).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout_secs(),
            relay: RelayTimeouts::default(),
            accept_invalid_certs: false,
        }
    }
}

const fn default_http_timeout_secs() -> u64 {
    30
}

/// A successful hand-off to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Name of the provider that accepted the message.
    pub provider: String,
}

/// Failure of an entire chain traversal.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The chain is empty; nothing was attempted.
    #[error("No enabled providers configured")]
    NoProviders,

    /// Every provider failed for this message.
    #[error("All providers failed for '{recipient}'")]
    Exhausted {
        recipient: String,
        /// Per-provider failures, in the order they were tried.
        failures: Vec<(String, TransportError)>,
    },
}

impl ChainError {
    /// One-line description of every provider's failure.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::NoProviders => self.to_string(),
            Self::Exhausted { failures, .. } => failures
                .iter()
                .map(|(name, error)| format!("{name}: {error}"))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// The closed set of provider kinds, dispatching behind [`Transport`].
#[derive(Debug)]
pub enum ProviderTransport {
    HttpApi(HttpApiTransport),
    SmtpRelay(SmtpRelayTransport),
}

#[async_trait]
impl Transport for ProviderTransport {
    fn name(&self) -> &str {
        match self {
            Self::HttpApi(transport) => transport.name(),
            Self::SmtpRelay(transport) => transport.name(),
        }
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        match self {
            Self::HttpApi(transport) => transport.send(message).await,
            Self::SmtpRelay(transport) => transport.send(message).await,
        }
    }
}

/// Ordered list of transport adapters with uniform failover.
///
/// Tries each provider exactly once, in the order given; any
/// [`TransportError`] falls through to the next provider. Reordering or
/// adding providers is a configuration change, not a code change.
#[derive(Debug, Default)]
pub struct ProviderChain {
    providers: Vec<Box<dyn Transport>>,
}

impl ProviderChain {
    /// Build a chain from already-constructed transports (test seam).
    #[must_use]
    pub fn new(providers: Vec<Box<dyn Transport>>) -> Self {
        Self { providers }
    }

    /// Build the chain from configured provider rows: enabled providers
    /// only, ascending priority.
    ///
    /// # Errors
    /// `TransportError::Config` when no enabled provider exists (a fatal
    /// configuration failure — retrying cannot fix missing configuration)
    /// or an adapter cannot be constructed.
    pub fn from_providers(
        rows: &[Provider],
        config: &TransportConfig,
    ) -> Result<Self, TransportError> {
        let mut enabled: Vec<&Provider> = rows.iter().filter(|p| p.enabled).collect();
        enabled.sort_by_key(|p| p.priority);

        if enabled.is_empty() {
            return Err(TransportError::Config(
                "no enabled transport providers".to_string(),
            ));
        }

        let mut providers: Vec<Box<dyn Transport>> = Vec::with_capacity(enabled.len());
        for row in enabled {
            let transport = match &row.credentials {
                ProviderCredentials::HttpApi { endpoint, api_key } => {
                    ProviderTransport::HttpApi(HttpApiTransport::new(
                        &row.name,
                        endpoint,
                        api_key,
                        Duration::from_secs(config.http_timeout_secs),
                    )?)
                }
                ProviderCredentials::SmtpRelay {
                    host,
                    port,
                    username,
                    password,
                    tls,
                } => ProviderTransport::SmtpRelay(
                    SmtpRelayTransport::new(
                        &row.name, host, *port, username, password, *tls, config.relay,
                    )
                    .accept_invalid_certs(config.accept_invalid_certs),
                ),
            };
            providers.push(Box::new(transport));
        }

        Ok(Self { providers })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Try each provider in order until one accepts the message.
    ///
    /// # Errors
    /// `ChainError::Exhausted` when every provider failed;
    /// `ChainError::NoProviders` when the chain is empty.
    pub async fn send(&self, message: &OutboundMessage) -> Result<Delivery, ChainError> {
        if self.providers.is_empty() {
            return Err(ChainError::NoProviders);
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.send(message).await {
                Ok(()) => {
                    tracing::debug!(
                        provider = provider.name(),
                        recipient = %message.to,
                        "provider accepted message"
                    );
                    return Ok(Delivery {
                        provider: provider.name().to_string(),
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        provider = provider.name(),
                        recipient = %message.to,
                        error = %error,
                        "provider failed, falling through"
                    );
                    failures.push((provider.name().to_string(), error));
                }
            }
        }

        Err(ChainError::Exhausted {
            recipient: message.to.clone(),
            failures,
        })
    }
}
