//! API server and client.
//!
//! One request per line, one response per line. A connection may carry any
//! number of requests. The kernel-reported peer uid of the connection is the
//! transport caller metadata handed to the handler.

use crate::{IpcError, IpcResult};
use gatehouse_protocol_types::{ApiRequest, ApiResponse};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Request handler. Runs on a blocking thread, so it may wait on
/// synchronous work.
pub type HandlerFn = Arc<dyn Fn(ApiRequest, Option<i64>) -> ApiResponse + Send + Sync>;

/// API server listening on a Unix domain socket.
pub struct ApiServer {
    socket_path: PathBuf,
    handler: HandlerFn,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    /// Create a new API server.
    pub fn new<F>(socket_path: impl Into<PathBuf>, handler: F) -> Self
    where
        F: Fn(ApiRequest, Option<i64>) -> ApiResponse + Send + Sync + 'static,
    {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            socket_path: socket_path.into(),
            handler: Arc::new(handler),
            shutdown_tx,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Get a shutdown receiver.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Get a shutdown sender (for tasks that need to trigger shutdown).
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the socket, replacing a stale socket file.
    pub fn bind(&self) -> IpcResult<UnixListener> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(UnixListener::bind(&self.socket_path)?)
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self) -> IpcResult<()> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Serve an already bound listener until shutdown.
    pub async fn serve(&self, listener: UnixListener) -> IpcResult<()> {
        info!(path = %self.socket_path.display(), "API server listening");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _)) => {
                            let handler = self.handler.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, handler).await {
                                    error!(error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept error");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("API server shutting down");
                    break;
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

/// Handle a single client connection.
async fn handle_connection(stream: UnixStream, handler: HandlerFn) -> IpcResult<()> {
    let peer_uid = match stream.peer_cred() {
        Ok(cred) => Some(i64::from(cred.uid())),
        Err(e) => {
            warn!(error = %e, "Peer credentials unavailable");
            None
        }
    };

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    debug!(?peer_uid, "Client connected");

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            debug!("Client disconnected");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match ApiRequest::from_json(trimmed) {
            Ok(request) => {
                debug!(id = %request.id, action = %request.action, "Received request");
                let handler = handler.clone();
                let id = request.id.clone();
                match tokio::task::spawn_blocking(move || handler(request, peer_uid)).await {
                    Ok(response) => response,
                    Err(e) => {
                        error!(id = %id, error = %e, "Handler task failed");
                        ApiResponse::failure(&id, IpcError::Handler(e.to_string()).to_string())
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse request");
                ApiResponse::failure("", format!("Parse error: {}", e))
            }
        };

        let response_json = response.to_json()?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Client for the API server.
pub struct ApiClient {
    socket_path: PathBuf,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Send a request and wait for its response.
    pub async fn call(&self, request: &ApiRequest) -> IpcResult<ApiResponse> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| IpcError::Socket(format!("Failed to connect: {}", e)))?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let request_json = request.to_json()?;
        writer.write_all(request_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        let mut line = String::new();
        reader.read_line(&mut line).await?;

        if line.is_empty() {
            return Err(IpcError::ConnectionClosed);
        }

        Ok(ApiResponse::from_json(line.trim())?)
    }

    /// Check if a server accepts connections.
    pub async fn is_server_running(&self) -> bool {
        UnixStream::connect(&self.socket_path).await.is_ok()
    }
}
