//! TCP server
//!
//! Accepts connections and serves newline-delimited JSON requests. Every
//! connection runs on its own tokio task; all of them share one store.

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use vehicle_core::{SharedStore, StoreError};

use crate::{ChangeNotifier, RequestHandler, VehicleResponse, DEFAULT_PORT, SERVICE_NAME};

/// Longest request line accepted, newline included
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0:9000)
    pub bind_addr: String,
    /// Name reported by the status request
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            service_name: SERVICE_NAME.to_string(),
        }
    }
}

/// Errors from the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The vehicle API server
pub struct VehicleServer {
    listener: TcpListener,
    handler: Arc<RequestHandler>,
    notifier: Option<Arc<ChangeNotifier>>,
}

impl VehicleServer {
    /// Bind the listener
    pub async fn bind(config: &ServerConfig, store: SharedStore) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;

        Ok(Self {
            listener,
            handler: Arc::new(RequestHandler::new(store, &config.service_name)),
            notifier: None,
        })
    }

    /// Forward committed writes through `notifier`
    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        if !notifier.is_empty() {
            self.notifier = Some(Arc::new(notifier));
        }
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever
    pub async fn run(self) {
        match self.listener.local_addr() {
            Ok(addr) => info!("Vehicle API listening on {}", addr),
            Err(e) => error!("Vehicle API listening on unknown address: {}", e),
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Connection from {}", peer);
                    let handler = self.handler.clone();
                    let notifier = self.notifier.clone();

                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, handler, notifier).await {
                            error!("Connection {} error: {}", peer, e);
                        }
                        debug!("Connection {} closed", peer);
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    handler: Arc<RequestHandler>,
    notifier: Option<Arc<ChangeNotifier>>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = (&mut reader)
            .take(MAX_LINE_BYTES as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            break;
        }

        if n == MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            warn!("Request line exceeds {} bytes, closing connection", MAX_LINE_BYTES);
            let err = StoreError::InvalidRequest(format!(
                "Request line exceeds {} bytes",
                MAX_LINE_BYTES
            ));
            write_response(&mut writer, &VehicleResponse::error(&err)).await?;
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let handled = handler.handle_line(line);
        if handled.response.is_error() {
            debug!("Request failed: {}", line);
        }

        if let (Some(change), Some(notifier)) = (&handled.change, &notifier) {
            notifier.notify(change);
        }

        write_response(&mut writer, &handled.response).await?;
    }

    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &VehicleResponse,
) -> std::io::Result<()> {
    let mut json = serde_json::to_string(response).unwrap_or_else(|_| {
        r#"{"status":"error","kind":"invalid_request","message":"Serialization failed","code":400}"#
            .to_string()
    });
    json.push('\n');

    writer.write_all(json.as_bytes()).await?;
    writer.flush().await
}
