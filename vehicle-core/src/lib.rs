//! Vehicle Core - Signal tree model and concurrent signal store
//!
//! This crate provides the foundational primitives:
//! - Tagged signal values (scalar leaves and composite groups)
//! - Dot-delimited signal addresses with two-level resolution
//! - The shared signal store guarding the tree behind one lock
//! - The default vehicle snapshot loaded at startup

pub mod address;
pub mod defaults;
pub mod error;
pub mod store;
pub mod value;

pub use address::*;
pub use defaults::*;
pub use error::*;
pub use store::*;
pub use value::*;

/// Separator between address segments
pub const ADDRESS_SEPARATOR: char = '.';

/// Deepest address the resolver accepts (`Group.Signal`)
pub const MAX_ADDRESS_DEPTH: usize = 2;
