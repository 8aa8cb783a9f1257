//! Vehicle API - request layer over the signal store
//!
//! Exposes the store to other processes:
//! - Newline-delimited JSON protocol (read all, read, write, status)
//! - Per-connection tokio tasks sharing one store handle
//! - Async client for dashboards and tooling
//! - Best-effort HTTP notification of writes to sibling services

pub mod protocol;
pub mod handler;
pub mod server;
pub mod client;
pub mod notify;

pub use protocol::*;
pub use handler::*;
pub use server::*;
pub use client::*;
pub use notify::*;

/// Default listen port
pub const DEFAULT_PORT: u16 = 9000;

/// Service name reported by the status request
pub const SERVICE_NAME: &str = "vehicle-api";
