//! The SMTP relay provider adapter.

use std::time::Duration;

use async_trait::async_trait;
use courier_common::provider::RelayTls;
use serde::{Deserialize, Serialize};

use crate::{OutboundMessage, Transport, TransportError, smtp::SmtpClient};

/// Timeouts for SMTP relay operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelayTimeouts {
    /// Timeout for connection establishment.
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,

    /// Timeout for each command/reply exchange.
    #[serde(default = "default_command_secs")]
    pub command_secs: u64,

    /// Timeout for message content transmission; longer than the command
    /// timeout to accommodate large bodies.
    #[serde(default = "default_data_secs")]
    pub data_secs: u64,
}

impl Default for RelayTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            command_secs: default_command_secs(),
            data_secs: default_data_secs(),
        }
    }
}

const fn default_connect_secs() -> u64 {
    10
}

const fn default_command_secs() -> u64 {
    30
}

const fn default_data_secs() -> u64 {
    120
}

/// Transport adapter for an authenticated SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpRelayTransport {
    name: String,
    host: String,
    port: u16,
    username: String,
    password: String,
    tls: RelayTls,
    timeouts: RelayTimeouts,
    accept_invalid_certs: bool,
}

impl SmtpRelayTransport {
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "Mirrors the provider credential row")]
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        tls: RelayTls,
        timeouts: RelayTimeouts,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            tls,
            timeouts,
            accept_invalid_certs: false,
        }
    }

    /// Accept invalid TLS certificates (testing only).
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Domain announced in EHLO: the sender's domain when it has one.
    fn helo_domain(message: &OutboundMessage) -> &str {
        message
            .from
            .split_once('@')
            .map_or("localhost", |(_, domain)| domain)
    }
}

#[async_trait]
impl Transport for SmtpRelayTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let address = format!("{}:{}", self.host, self.port);
        let helo = Self::helo_domain(message);

        let mut client = SmtpClient::connect(
            &address,
            self.host.clone(),
            Duration::from_secs(self.timeouts.connect_secs),
        )
        .await?
        .accept_invalid_certs(self.accept_invalid_certs)
        .command_timeout(Duration::from_secs(self.timeouts.command_secs));

        client.greeting().await?;
        let ehlo = client.ehlo(helo).await?;

        let upgrade = match self.tls {
            RelayTls::Required => {
                if !ehlo.advertises("STARTTLS") {
                    return Err(TransportError::Tls(format!(
                        "{} does not advertise STARTTLS",
                        self.host
                    )));
                }
                true
            }
            RelayTls::Opportunistic => ehlo.advertises("STARTTLS"),
            RelayTls::Disabled => false,
        };

        if upgrade {
            client = client.starttls().await?;
            // RFC 3207: the session state resets after the TLS handshake.
            client.ehlo(helo).await?;
        }

        if !self.username.is_empty() {
            client
                .auth_login(&self.username, &self.password)
                .await
                .map_err(|e| match e {
                    crate::smtp::ClientError::Reply { code, message } => {
                        TransportError::Auth(format!("{code} {message}"))
                    }
                    other => other.into(),
                })?;
        }

        client.mail_from(&message.from).await?;
        client.rcpt_to(&message.to).await?;
        client
            .data(
                &message.mime(),
                Duration::from_secs(self.timeouts.data_secs),
            )
            .await?;

        // The message is accepted; a failed QUIT is not a delivery failure.
        if let Err(e) = client.quit().await {
            tracing::debug!(relay = %self.host, error = %e, "QUIT after accepted message failed");
        }

        Ok(())
    }
}
