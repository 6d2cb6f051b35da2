//! SMTP submission client with STARTTLS and AUTH LOGIN support.

use std::{sync::Arc, time::Duration};

use base64::Engine as _;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
};

use super::{
    error::{ClientError, Result},
    reply::{Reply, ReplyLine},
};

/// An SMTP connection that is either plain TCP or TLS-wrapped.
#[derive(Debug)]
enum Connection {
    Plain(BufReader<TcpStream>),
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

impl Connection {
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Plain(stream) => {
                stream.write_all(data).await?;
                stream.flush().await
            }
            Self::Tls(stream) => {
                stream.write_all(data).await?;
                stream.flush().await
            }
        }
    }

    async fn read_line(&mut self, line: &mut String) -> std::io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read_line(line).await,
            Self::Tls(stream) => stream.read_line(line).await,
        }
    }

    /// Upgrade a plain connection to TLS.
    async fn upgrade_to_tls(self, host: &str, accept_invalid_certs: bool) -> Result<Self> {
        match self {
            Self::Plain(stream) => {
                let stream = stream.into_inner();

                let mut root_store = RootCertStore::empty();
                let certs = rustls_native_certs::load_native_certs();
                for cert in certs.certs {
                    root_store.add(cert).map_err(|e| {
                        ClientError::Tls(format!("Failed to add certificate: {e}"))
                    })?;
                }
                if !certs.errors.is_empty() {
                    tracing::warn!(?certs.errors, "Some certificates could not be loaded");
                }

                let mut config = ClientConfig::builder()
                    .with_root_certificates(root_store)
                    .with_no_client_auth();

                // For testing against self-signed relays only.
                if accept_invalid_certs {
                    config
                        .dangerous()
                        .set_certificate_verifier(Arc::new(NoVerifier));
                }

                let connector = TlsConnector::from(Arc::new(config));
                let server_name = ServerName::try_from(host.to_string())
                    .map_err(|e| ClientError::Tls(format!("Invalid server name: {e}")))?;

                let tls_stream = connector
                    .connect(server_name, stream)
                    .await
                    .map_err(|e| ClientError::Tls(e.to_string()))?;

                Ok(Self::Tls(Box::new(BufReader::new(tls_stream))))
            }
            Self::Tls(_) => Err(ClientError::Tls("Connection is already TLS".to_string())),
        }
    }
}

/// A certificate verifier that accepts all certificates (testing only).
#[derive(Debug)]
struct NoVerifier;

impl tokio_rustls::rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[tokio_rustls::rustls::pki_types::CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: tokio_rustls::rustls::pki_types::UnixTime,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::ServerCertVerified,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<tokio_rustls::rustls::SignatureScheme> {
        vec![
            tokio_rustls::rustls::SignatureScheme::RSA_PKCS1_SHA256,
            tokio_rustls::rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            tokio_rustls::rustls::SignatureScheme::ED25519,
        ]
    }
}

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// An SMTP submission client.
#[derive(Debug)]
pub struct SmtpClient {
    connection: Connection,
    host: String,
    accept_invalid_certs: bool,
    command_timeout: Duration,
}

impl SmtpClient {
    /// Connect to `address` (`host:port`), validating TLS against `host`.
    ///
    /// # Errors
    /// Returns an error if the TCP connection fails or times out.
    pub async fn connect(
        address: &str,
        host: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| ClientError::Timeout(format!("connect to {address}")))??;

        Ok(Self {
            connection: Connection::Plain(BufReader::new(stream)),
            host: host.into(),
            accept_invalid_certs: false,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    /// Accept invalid TLS certificates (testing only).
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Override the per-command timeout.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Read a complete (possibly multi-line) reply.
    ///
    /// # Errors
    /// Returns an error on I/O failure, timeout, or a malformed reply.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        self.read_reply_within(self.command_timeout).await
    }

    async fn read_reply_within(&mut self, timeout: Duration) -> Result<Reply> {
        let mut code = None;
        let mut lines = Vec::new();

        loop {
            let mut line = String::new();
            let read = tokio::time::timeout(timeout, self.connection.read_line(&mut line))
                .await
                .map_err(|_| ClientError::Timeout("server reply".to_string()))??;
            if read == 0 {
                return Err(ClientError::ConnectionClosed);
            }

            let parsed = ReplyLine::parse(line.trim_end_matches(['\r', '\n']))?;
            match code {
                None => code = Some(parsed.code),
                Some(expected) if expected != parsed.code => {
                    return Err(ClientError::Parse(format!(
                        "status code mismatch in multi-line reply: expected {expected}, got {}",
                        parsed.code
                    )));
                }
                Some(_) => {}
            }

            lines.push(parsed.message);
            if parsed.is_last {
                // `code` was set on the first iteration.
                return Ok(Reply::new(code.unwrap_or_default(), lines));
            }
        }
    }

    /// Send one command line and read the reply.
    ///
    /// # Errors
    /// Returns an error on I/O failure, timeout, or a malformed reply.
    pub async fn command(&mut self, line: &str) -> Result<Reply> {
        self.connection
            .write_all(format!("{line}\r\n").as_bytes())
            .await?;
        self.read_reply().await
    }

    /// Read the server greeting (220).
    ///
    /// # Errors
    /// Returns `ClientError::Reply` when the server refuses the connection.
    pub async fn greeting(&mut self) -> Result<Reply> {
        let reply = self.read_reply().await?;
        require(reply, Reply::is_success)
    }

    /// Send EHLO; the reply lists advertised extensions.
    ///
    /// # Errors
    /// Returns `ClientError::Reply` when the server rejects the handshake.
    pub async fn ehlo(&mut self, domain: &str) -> Result<Reply> {
        let reply = self.command(&format!("EHLO {domain}")).await?;
        require(reply, Reply::is_success)
    }

    /// Issue STARTTLS and upgrade the connection.
    ///
    /// Consumes the client because the underlying stream changes type; the
    /// caller must re-EHLO on the returned client.
    ///
    /// # Errors
    /// Returns an error when the server refuses STARTTLS or the handshake
    /// fails.
    pub async fn starttls(mut self) -> Result<Self> {
        let reply = self.command("STARTTLS").await?;
        if reply.code != 220 {
            return Err(ClientError::Reply {
                code: reply.code,
                message: reply.message(),
            });
        }

        let Self {
            connection,
            host,
            accept_invalid_certs,
            command_timeout,
        } = self;
        let connection = connection.upgrade_to_tls(&host, accept_invalid_certs).await?;

        Ok(Self {
            connection,
            host,
            accept_invalid_certs,
            command_timeout,
        })
    }

    /// Authenticate with AUTH LOGIN.
    ///
    /// # Errors
    /// Returns `ClientError::Reply` when any step is refused (the final
    /// accept is 235).
    pub async fn auth_login(&mut self, username: &str, password: &str) -> Result<()> {
        let b64 = base64::engine::general_purpose::STANDARD;

        let reply = self.command("AUTH LOGIN").await?;
        expect_code(&reply, 334)?;

        let reply = self.command(&b64.encode(username)).await?;
        expect_code(&reply, 334)?;

        let reply = self.command(&b64.encode(password)).await?;
        expect_code(&reply, 235)?;

        Ok(())
    }

    /// Send MAIL FROM.
    ///
    /// # Errors
    /// Returns `ClientError::Reply` when the sender is refused.
    pub async fn mail_from(&mut self, sender: &str) -> Result<Reply> {
        let reply = self.command(&format!("MAIL FROM:<{sender}>")).await?;
        require(reply, Reply::is_success)
    }

    /// Send RCPT TO.
    ///
    /// # Errors
    /// Returns `ClientError::Reply` when the recipient is refused.
    pub async fn rcpt_to(&mut self, recipient: &str) -> Result<Reply> {
        let reply = self.command(&format!("RCPT TO:<{recipient}>")).await?;
        require(reply, Reply::is_success)
    }

    /// Send DATA followed by the dot-stuffed message content.
    ///
    /// # Errors
    /// Returns `ClientError::Reply` when the server refuses the DATA phase
    /// or the content.
    pub async fn data(&mut self, mime: &str, data_timeout: Duration) -> Result<Reply> {
        let reply = self.command("DATA").await?;
        if !reply.is_intermediate() {
            return Err(ClientError::Reply {
                code: reply.code,
                message: reply.message(),
            });
        }

        self.connection.write_all(dot_stuff(mime).as_bytes()).await?;
        self.connection.write_all(b".\r\n").await?;

        let reply = self.read_reply_within(data_timeout).await?;
        require(reply, Reply::is_success)
    }

    /// Send QUIT. The message is already accepted at this point, so the
    /// reply code is not checked.
    ///
    /// # Errors
    /// Returns an error only on I/O failure.
    pub async fn quit(&mut self) -> Result<()> {
        let _ = self.command("QUIT").await?;
        Ok(())
    }
}

/// Turn an error reply into a `ClientError::Reply`.
fn require(reply: Reply, accept: impl Fn(&Reply) -> bool) -> Result<Reply> {
    if accept(&reply) {
        Ok(reply)
    } else {
        Err(ClientError::Reply {
            code: reply.code,
            message: reply.message(),
        })
    }
}

fn expect_code(reply: &Reply, code: u16) -> Result<()> {
    if reply.code == code {
        Ok(())
    } else {
        Err(ClientError::Reply {
            code: reply.code,
            message: reply.message(),
        })
    }
}

/// Normalize line endings to CRLF and escape leading dots (RFC 5321 §4.5.2).
fn dot_stuff(body: &str) -> String {
    let normalized = body.replace("\r\n", "\n");
    let mut out = String::with_capacity(body.len() + 16);
    for line in normalized.split('\n') {
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}
