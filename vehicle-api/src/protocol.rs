//! Wire protocol
//!
//! One JSON object per line in each direction. Requests are tagged by
//! `op`, responses by `status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vehicle_core::{ErrorKind, Scalar, SignalTree, StoreError};

/// Requests sent to the vehicle API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum VehicleRequest {
    /// Snapshot of every signal
    ReadAll,

    /// Read one signal
    Read { address: String },

    /// Write one signal
    Write {
        address: String,
        /// Absent or `null` is rejected before the store is touched
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<serde_json::Value>,
    },

    /// Service liveness and metadata
    Status,
}

impl VehicleRequest {
    pub fn read(address: &str) -> Self {
        VehicleRequest::Read {
            address: address.to_string(),
        }
    }

    pub fn write(address: &str, value: impl Into<Scalar>) -> Self {
        VehicleRequest::Write {
            address: address.to_string(),
            value: serde_json::to_value(value.into()).ok(),
        }
    }
}

/// Responses from the vehicle API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VehicleResponse {
    /// Full signal tree
    Snapshot { signals: SignalTree },

    /// The addressed signal alone
    Signal { address: String, value: Scalar },

    /// Service metadata
    Service(ServiceStatus),

    /// Request failed
    Error {
        kind: ErrorKind,
        message: String,
        code: u16,
    },
}

impl VehicleResponse {
    pub fn signal(address: &str, value: Scalar) -> Self {
        VehicleResponse::Signal {
            address: address.to_string(),
            value,
        }
    }

    pub fn error(err: &StoreError) -> Self {
        VehicleResponse::Error {
            kind: err.kind(),
            message: err.to_string(),
            code: err.status_code(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, VehicleResponse::Error { .. })
    }
}

/// Service status payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub signal_count: usize,
}
