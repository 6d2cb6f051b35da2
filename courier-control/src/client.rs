//! Control client.

use std::time::Duration;

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
};

use crate::{Command, ControlError, Request, Response, Result};

/// Client for the control socket. One request per connection.
#[derive(Debug, Clone)]
pub struct ControlClient {
    socket_path: String,
    timeout: Duration,
}

impl ControlClient {
    #[must_use]
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one command and await the response.
    ///
    /// # Errors
    /// Returns an error when the socket is unreachable, the exchange times
    /// out, or the response cannot be decoded.
    pub async fn send(&self, command: Command) -> Result<Response> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let mut stream = BufReader::new(stream);

        let mut encoded = serde_json::to_string(&Request::new(command))?;
        encoded.push('\n');
        stream.get_mut().write_all(encoded.as_bytes()).await?;
        stream.get_mut().flush().await?;

        let mut line = String::new();
        let read = tokio::time::timeout(self.timeout, stream.read_line(&mut line))
            .await
            .map_err(|_| ControlError::Timeout)??;
        if read == 0 {
            return Err(ControlError::ConnectionClosed);
        }

        let response: Response = serde_json::from_str(&line)?;
        if !response.is_version_compatible() {
            return Err(ControlError::VersionMismatch {
                expected: crate::protocol::PROTOCOL_VERSION,
                actual: response.version,
            });
        }

        Ok(response)
    }
}
