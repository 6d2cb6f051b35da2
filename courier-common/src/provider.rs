//! Transport provider configuration.
//!
//! Providers are ordered ascending by `priority`; only enabled providers
//! participate in the failover chain. Ordering is a business decision
//! (cost, deliverability) expressed purely as a number — the chain itself
//! contains no provider-specific branching.

use serde::{Deserialize, Serialize};

/// The closed set of provider kinds the engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// HTTP transactional-email API (JSON POST, bearer auth).
    HttpApi,
    /// SMTP-capable relay (authenticated submission).
    SmtpRelay,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::HttpApi => "http_api",
            Self::SmtpRelay => "smtp_relay",
        })
    }
}

/// TLS posture for SMTP relay connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayTls {
    /// STARTTLS must succeed or the provider fails.
    #[default]
    Required,
    /// Attempt STARTTLS when the relay advertises it.
    Opportunistic,
    /// Plaintext submission (private networks and tests only).
    Disabled,
}

/// Kind-specific connection material for a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCredentials {
    HttpApi {
        /// Full endpoint URL the send request is POSTed to.
        endpoint: String,
        /// Bearer token.
        api_key: String,
    },
    SmtpRelay {
        host: String,
        port: u16,
        username: String,
        password: String,
        #[serde(default)]
        tls: RelayTls,
    },
}

/// A configured transport provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Name recorded in delivery logs as `provider_used`.
    pub name: String,
    /// Failover order, ascending. Lower tries first.
    pub priority: u32,
    /// Disabled providers are skipped entirely.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Kind-specific connection material.
    pub credentials: ProviderCredentials,
}

const fn default_true() -> bool {
    true
}

impl Provider {
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self.credentials {
            ProviderCredentials::HttpApi { .. } => ProviderKind::HttpApi,
            ProviderCredentials::SmtpRelay { .. } => ProviderKind::SmtpRelay,
        }
    }
}
