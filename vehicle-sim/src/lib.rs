//! Vehicle Sim - background sensor emulation
//!
//! Perturbs a fixed set of numeric signals on a timer:
//! - Each signal follows a bounded random walk
//! - Walks are described by a profile (built-in or TOML)
//! - Every write goes through the shared store's public contract

pub mod profile;
pub mod simulator;

pub use profile::*;
pub use simulator::*;

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 3000;
