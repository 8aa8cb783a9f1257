//! Request handler
//!
//! Maps protocol requests onto store operations. The handler is
//! synchronous: each request is a single store call that runs to
//! completion, so no lock is ever held across an await point.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use vehicle_core::{Scalar, SharedStore, SignalChange, StoreError};

use crate::{ServiceStatus, VehicleRequest, VehicleResponse};

/// Outcome of one request
#[derive(Debug, Clone)]
pub struct Handled {
    pub response: VehicleResponse,
    /// Set when a write committed, for change notification
    pub change: Option<SignalChange>,
}

impl Handled {
    fn respond(response: VehicleResponse) -> Self {
        Self {
            response,
            change: None,
        }
    }
}

/// Dispatches requests against a shared store
pub struct RequestHandler {
    store: SharedStore,
    service: String,
    started_at: DateTime<Utc>,
}

impl RequestHandler {
    pub fn new(store: SharedStore, service: &str) -> Self {
        Self {
            store,
            service: service.to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Parse and handle one raw protocol line
    pub fn handle_line(&self, line: &str) -> Handled {
        match serde_json::from_str::<VehicleRequest>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!("Rejecting malformed request: {}", e);
                let err = StoreError::InvalidRequest(format!("Malformed request: {}", e));
                Handled::respond(VehicleResponse::error(&err))
            }
        }
    }

    pub fn handle(&self, request: VehicleRequest) -> Handled {
        match request {
            VehicleRequest::ReadAll => {
                info!("Vehicle info API called");
                Handled::respond(VehicleResponse::Snapshot {
                    signals: self.store.get_all(),
                })
            }
            VehicleRequest::Read { address } => {
                info!("Get signal API called for {}", address);
                let response = match self.store.get(&address) {
                    Ok(value) => VehicleResponse::signal(&address, value),
                    Err(e) => VehicleResponse::error(&e),
                };
                Handled::respond(response)
            }
            VehicleRequest::Write { address, value } => {
                info!("Set signal API called for {}", address);
                match self.write(&address, value) {
                    Ok(change) => Handled {
                        response: VehicleResponse::signal(&address, change.new.clone()),
                        change: Some(change),
                    },
                    Err(e) => Handled::respond(VehicleResponse::error(&e)),
                }
            }
            VehicleRequest::Status => {
                info!("Status API called");
                Handled::respond(VehicleResponse::Service(self.status()))
            }
        }
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            service: self.service.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: self.started_at,
            signal_count: self.store.signal_count(),
        }
    }

    fn write(
        &self,
        address: &str,
        value: Option<serde_json::Value>,
    ) -> Result<SignalChange, StoreError> {
        // Payload problems are reported before the address is resolved
        let value = value.ok_or_else(|| StoreError::InvalidRequest("Value missing".to_string()))?;
        let value = Scalar::try_from(value)?;
        self.store.replace(address, value)
    }
}
