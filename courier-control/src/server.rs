//! Control server implementation.

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use courier_common::Signal;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    sync::broadcast,
};
use tracing::{debug, error, info, trace};

use crate::{Command, ControlError, Request, Response, Result, protocol::PROTOCOL_VERSION};

/// Handler trait for executing control commands against the engine.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Execute a command and produce a response.
    ///
    /// # Errors
    /// Returns an error when the command cannot be executed; the server
    /// turns it into an error response for the client.
    async fn handle(&self, command: Command) -> Result<Response>;
}

/// Control server over a Unix domain socket.
pub struct ControlServer {
    socket_path: String,
    handler: Arc<dyn CommandHandler>,
}

impl ControlServer {
    #[must_use]
    pub fn new(socket_path: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            socket_path: socket_path.into(),
            handler,
        }
    }

    /// Serve until a shutdown signal arrives.
    ///
    /// # Errors
    /// Returns an error when the socket cannot be bound.
    pub async fn serve(&self, mut shutdown: broadcast::Receiver<Signal>) -> Result<()> {
        let socket_path = Path::new(&self.socket_path);
        if socket_path.exists() {
            // An active socket means another instance is running.
            if UnixStream::connect(socket_path).await.is_ok() {
                return Err(ControlError::Io(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    format!("Socket already in use: {}", self.socket_path),
                )));
            }
            // Stale socket from a crashed process.
            info!("Removing stale socket file: {}", self.socket_path);
            tokio::fs::remove_file(socket_path).await?;
        }
        if let Some(parent) = socket_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        #[cfg(unix)]
        {
            let metadata = tokio::fs::metadata(&self.socket_path).await?;
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            tokio::fs::set_permissions(&self.socket_path, perms).await?;
        }
        info!("Control server listening on: {}", self.socket_path);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let handler = Arc::clone(&self.handler);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, handler).await {
                                    error!("Error handling control connection: {e}");
                                }
                            });
                        }
                        Err(e) => error!("Error accepting control connection: {e}"),
                    }
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) => {
                            info!("Control server shutting down");
                            break;
                        }
                        Err(e) => {
                            error!("Control server shutdown channel error: {e}");
                            break;
                        }
                    }
                }
            }
        }

        if socket_path.exists() {
            debug!("Removing socket file: {}", self.socket_path);
            let _ = tokio::fs::remove_file(socket_path).await;
        }

        Ok(())
    }
}

/// Handle one connection: read a request line, execute, write a response
/// line.
async fn handle_connection(stream: UnixStream, handler: Arc<dyn CommandHandler>) -> Result<()> {
    // Bound reads so a broken client cannot hold the task forever.
    let timeout = Duration::from_secs(30);
    let mut stream = BufReader::new(stream);

    let mut line = String::new();
    let read = tokio::time::timeout(timeout, stream.read_line(&mut line))
        .await
        .map_err(|_| ControlError::Timeout)??;
    if read == 0 {
        return Err(ControlError::ConnectionClosed);
    }

    trace!("Received control request: {}", line.trim_end());

    let response = match serde_json::from_str::<Request>(&line) {
        Ok(request) if !request.is_version_compatible() => {
            Response::error(format!(
                "protocol version mismatch: server speaks {PROTOCOL_VERSION}, client sent {}",
                request.version
            ))
        }
        Ok(request) => match handler.handle(request.command).await {
            Ok(response) => response,
            Err(e) => Response::error(e.to_string()),
        },
        Err(e) => Response::error(format!("malformed request: {e}")),
    };

    let mut encoded = serde_json::to_string(&response)?;
    encoded.push('\n');
    stream.get_mut().write_all(encoded.as_bytes()).await?;
    stream.get_mut().flush().await?;

    Ok(())
}
