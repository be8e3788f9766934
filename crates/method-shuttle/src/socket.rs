//! Unix socket channel and executor service.
//!
//! NDJSON: the origin writes one envelope line and reads one outcome line.
//! A connection may carry several exchanges in sequence.

use crate::{
    InvocationOutcome, RemoteExecutor, RemoteFailure, ShuttleChannel, ShuttleError,
    ShuttleResult, WorkUnitEnvelope,
};
use crate::transport::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Origin-side channel to a [`ShuttleService`].
///
/// Connects once per delivery.
#[derive(Debug, Clone)]
pub struct UnixSocketChannel {
    socket_path: PathBuf,
}

impl UnixSocketChannel {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn exchange(&self, envelope: WorkUnitEnvelope) -> ShuttleResult<InvocationOutcome> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            ShuttleError::Transport(format!(
                "Failed to connect {}: {}",
                self.socket_path.display(),
                e
            ))
        })?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let line = envelope
            .to_json()
            .map_err(|e| ShuttleError::Capture(e.to_string()))?;
        writer.write_all(line.as_bytes()).await.map_err(io_error)?;
        writer.write_all(b"\n").await.map_err(io_error)?;
        writer.flush().await.map_err(io_error)?;

        let mut response = String::new();
        reader.read_line(&mut response).await.map_err(io_error)?;
        if response.is_empty() {
            return Err(ShuttleError::Transport(
                "Connection closed before the outcome arrived".to_string(),
            ));
        }

        serde_json::from_str(response.trim())
            .map_err(|e| ShuttleError::Transport(format!("Malformed outcome: {}", e)))
    }
}

impl ShuttleChannel for UnixSocketChannel {
    fn deliver(&self, envelope: WorkUnitEnvelope) -> BoxFuture<'_, ShuttleResult<InvocationOutcome>> {
        Box::pin(self.exchange(envelope))
    }
}

fn io_error(e: std::io::Error) -> ShuttleError {
    ShuttleError::Transport(e.to_string())
}

/// Runs a [`RemoteExecutor`] behind a Unix domain socket.
pub struct ShuttleService<C> {
    socket_path: PathBuf,
    executor: Arc<RemoteExecutor<C>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl<C: Send + Sync + 'static> ShuttleService<C> {
    pub fn new(socket_path: impl Into<PathBuf>, executor: Arc<RemoteExecutor<C>>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            socket_path: socket_path.into(),
            executor,
            shutdown_tx,
        }
    }

    /// Get a shutdown sender.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the socket, replacing a stale socket file.
    pub fn bind(&self) -> ShuttleResult<UnixListener> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(io_error)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        UnixListener::bind(&self.socket_path).map_err(io_error)
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self) -> ShuttleResult<()> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Serve an already bound listener until shutdown.
    pub async fn serve(&self, listener: UnixListener) -> ShuttleResult<()> {
        info!(path = %self.socket_path.display(), "shuttle service listening");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _)) => {
                            let executor = self.executor.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, executor).await {
                                    error!(error = %e, "shuttle connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "accept error");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shuttle service shutting down");
                    break;
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

async fn handle_connection<C: Send + Sync + 'static>(
    stream: UnixStream,
    executor: Arc<RemoteExecutor<C>>,
) -> ShuttleResult<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await.map_err(io_error)?;
        if bytes_read == 0 {
            debug!("shuttle origin disconnected");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let outcome = match WorkUnitEnvelope::from_json(trimmed) {
            Ok(envelope) => {
                let executor = executor.clone();
                tokio::task::spawn_blocking(move || executor.execute(&envelope))
                    .await
                    .unwrap_or_else(|e| InvocationOutcome::Failed {
                        failure: RemoteFailure::panic(format!("executor task failed: {}", e)),
                    })
            }
            Err(e) => {
                warn!(error = %e, "malformed envelope");
                InvocationOutcome::Failed {
                    failure: RemoteFailure::reconstruction(format!("Malformed envelope: {}", e)),
                }
            }
        };

        let response = serde_json::to_string(&outcome)
            .map_err(|e| ShuttleError::Transport(e.to_string()))?;
        writer.write_all(response.as_bytes()).await.map_err(io_error)?;
        writer.write_all(b"\n").await.map_err(io_error)?;
        writer.flush().await.map_err(io_error)?;
    }

    Ok(())
}
