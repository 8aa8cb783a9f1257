//! Store error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from signal store operations
///
/// Both kinds are reported to the immediate caller and leave the tree
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Signal not found: {address}")]
    NotFound { address: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Wire-level name of a store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidRequest,
}

impl StoreError {
    pub fn not_found(address: &str) -> Self {
        StoreError::NotFound {
            address: address.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP-style status code for the error
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidRequest => 400,
        }
    }
}
