//! Async client for the vehicle API
//!
//! Used by the CLI and by dashboard services to read and write signals on
//! a running server. Remote store errors come back as [`StoreError`] so
//! callers can tell a missing signal from a rejected payload.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use vehicle_core::{ErrorKind, Scalar, SignalTree, StoreError};

use crate::{ServiceStatus, VehicleRequest, VehicleResponse};

/// Errors from the client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server closed the connection")]
    Closed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Connection to a vehicle API server
pub struct VehicleClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl VehicleClient {
    /// Connect to a server
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Send a request and wait for its response
    pub async fn send(&mut self, request: &VehicleRequest) -> Result<VehicleResponse, ClientError> {
        let mut json = serde_json::to_string(request)
            .map_err(|e| ClientError::Protocol(format!("Serialization error: {}", e)))?;
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await?;

        let line = self.lines.next_line().await?.ok_or(ClientError::Closed)?;
        serde_json::from_str(&line)
            .map_err(|e| ClientError::Protocol(format!("Parse error: {} (response: {})", e, line)))
    }

    /// Snapshot of every signal
    pub async fn read_all(&mut self) -> Result<SignalTree, ClientError> {
        match self.send(&VehicleRequest::ReadAll).await? {
            VehicleResponse::Snapshot { signals } => Ok(signals),
            other => Err(unexpected(other, None)),
        }
    }

    /// Read one signal
    pub async fn read(&mut self, address: &str) -> Result<Scalar, ClientError> {
        let response = self.send(&VehicleRequest::read(address)).await?;
        expect_signal(response, address)
    }

    /// Write one signal, returning the stored value
    pub async fn write(
        &mut self,
        address: &str,
        value: impl Into<Scalar>,
    ) -> Result<Scalar, ClientError> {
        let response = self.send(&VehicleRequest::write(address, value)).await?;
        expect_signal(response, address)
    }

    /// Write an arbitrary JSON payload (or none at all)
    pub async fn write_raw(
        &mut self,
        address: &str,
        value: Option<serde_json::Value>,
    ) -> Result<Scalar, ClientError> {
        let request = VehicleRequest::Write {
            address: address.to_string(),
            value,
        };
        let response = self.send(&request).await?;
        expect_signal(response, address)
    }

    /// Service metadata
    pub async fn status(&mut self) -> Result<ServiceStatus, ClientError> {
        match self.send(&VehicleRequest::Status).await? {
            VehicleResponse::Service(status) => Ok(status),
            other => Err(unexpected(other, None)),
        }
    }
}

fn expect_signal(response: VehicleResponse, address: &str) -> Result<Scalar, ClientError> {
    match response {
        VehicleResponse::Signal { value, .. } => Ok(value),
        other => Err(unexpected(other, Some(address))),
    }
}

fn unexpected(response: VehicleResponse, address: Option<&str>) -> ClientError {
    match response {
        VehicleResponse::Error {
            kind: ErrorKind::NotFound,
            message,
            ..
        } => match address {
            Some(address) => StoreError::not_found(address).into(),
            None => ClientError::Protocol(message),
        },
        VehicleResponse::Error {
            kind: ErrorKind::InvalidRequest,
            message,
            ..
        } => {
            let reason = message.strip_prefix("Invalid request: ").unwrap_or(&message);
            StoreError::InvalidRequest(reason.to_string()).into()
        }
        other => ClientError::Protocol(format!("Unexpected response: {:?}", other)),
    }
}
