//! The HTTP transactional-email API provider adapter.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::{OutboundMessage, Transport, TransportError};

/// Body POSTed to the provider's send endpoint.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Transport adapter for an HTTP transactional-email API.
#[derive(Debug, Clone)]
pub struct HttpApiTransport {
    name: String,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpApiTransport {
    /// Build an adapter with a request-level timeout baked into the client.
    ///
    /// # Errors
    /// `TransportError::Config` if the HTTP client cannot be constructed.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl Transport for HttpApiTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &message.from,
                to: &message.to,
                subject: &message.subject,
                html: &message.html_body,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(format!("POST {}", self.endpoint))
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let detail = format!("{status}: {}", truncate(&body, 200));

        match status.as_u16() {
            401 | 403 => Err(TransportError::Auth(detail)),
            429 => Err(TransportError::Unavailable(detail)),
            code if (400..500).contains(&code) => Err(TransportError::Rejected(detail)),
            code if (500..600).contains(&code) => Err(TransportError::Unavailable(detail)),
            _ => Err(TransportError::Protocol(detail)),
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
