//! Signal addresses
//!
//! An address is a dot-delimited path such as `VehicleSpeed` or
//! `Lights.Headlights`. Resolution is deliberately shallow:
//! - the full address is first tried as a top-level key
//! - otherwise a two-segment address is read as `group.signal`
//! - anything deeper, or anything landing on a group, does not resolve

use std::fmt;

use crate::{Scalar, SignalTree, SignalValue, StoreError, ADDRESS_SEPARATOR, MAX_ADDRESS_DEPTH};

/// A parsed signal address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalAddress {
    raw: String,
    segments: Vec<String>,
}

impl SignalAddress {
    /// Parse an address string
    ///
    /// Empty addresses and empty segments (`"Lights."`, `"a..b"`) can never
    /// name a signal and fail with `NotFound`.
    pub fn parse(address: &str) -> Result<Self, StoreError> {
        let segments: Vec<String> = address
            .split(ADDRESS_SEPARATOR)
            .map(str::to_string)
            .collect();

        if address.is_empty() || segments.iter().any(String::is_empty) {
            return Err(StoreError::not_found(address));
        }

        Ok(Self {
            raw: address.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Locate the scalar leaf this address names
    pub fn resolve<'t>(&self, tree: &'t SignalTree) -> Option<&'t Scalar> {
        if let Some(SignalValue::Scalar(leaf)) = tree.get(&self.raw) {
            return Some(leaf);
        }

        let (parent, child) = self.group_and_signal()?;
        match tree.get(parent)? {
            SignalValue::Composite(group) => group.get(child)?.as_scalar(),
            SignalValue::Scalar(_) => None,
        }
    }

    /// Mutable counterpart of [`resolve`](Self::resolve)
    pub fn resolve_mut<'t>(&self, tree: &'t mut SignalTree) -> Option<&'t mut Scalar> {
        if matches!(tree.get(&self.raw), Some(SignalValue::Scalar(_))) {
            return match tree.get_mut(&self.raw) {
                Some(SignalValue::Scalar(leaf)) => Some(leaf),
                _ => None,
            };
        }

        let (parent, child) = self.group_and_signal()?;
        match tree.get_mut(parent)? {
            SignalValue::Composite(group) => match group.get_mut(child)? {
                SignalValue::Scalar(leaf) => Some(leaf),
                SignalValue::Composite(_) => None,
            },
            SignalValue::Scalar(_) => None,
        }
    }

    fn group_and_signal(&self) -> Option<(&str, &str)> {
        match self.segments.as_slice() {
            [parent, child] if self.segments.len() == MAX_ADDRESS_DEPTH => {
                Some((parent.as_str(), child.as_str()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for SignalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
