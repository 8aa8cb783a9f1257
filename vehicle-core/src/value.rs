//! Signal values
//!
//! A signal tree is a mapping from names to values, where every value is
//! either a scalar leaf or a composite group of further values:
//! - Scalars carry the actual telemetry (numbers, text, flags)
//! - Composites group related signals (`Lights`, `Doors`, ...)
//!
//! Both serialize to plain JSON, so a snapshot of the tree looks exactly
//! like the vehicle status document served to callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{StoreError, ADDRESS_SEPARATOR};

/// A scalar signal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view of the value, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Bool(_) | Scalar::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            // Debug keeps the trailing `.0` on whole floats
            Scalar::Float(v) => write!(f, "{:?}", v),
            Scalar::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl TryFrom<serde_json::Value> for Scalar {
    type Error = StoreError;

    /// Accept any JSON scalar; `null`, arrays and objects are rejected
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(Scalar::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Scalar::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Scalar::Float(f))
                } else {
                    Err(StoreError::InvalidRequest(format!(
                        "Unrepresentable number: {}",
                        n
                    )))
                }
            }
            Value::String(s) => Ok(Scalar::Text(s)),
            Value::Null => Err(StoreError::InvalidRequest("Value missing".to_string())),
            Value::Array(_) | Value::Object(_) => Err(StoreError::InvalidRequest(
                "Value must be a scalar".to_string(),
            )),
        }
    }
}

/// A node in the signal tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Leaf signal
    Scalar(Scalar),
    /// Named group of signals
    Composite(SignalTree),
}

impl SignalValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            SignalValue::Scalar(s) => Some(s),
            SignalValue::Composite(_) => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, SignalValue::Composite(_))
    }
}

impl From<Scalar> for SignalValue {
    fn from(v: Scalar) -> Self {
        SignalValue::Scalar(v)
    }
}

macro_rules! signal_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SignalValue {
                fn from(v: $ty) -> Self {
                    SignalValue::Scalar(v.into())
                }
            }
        )*
    };
}

signal_value_from!(bool, i64, i32, f64, &str, String);

impl From<SignalTree> for SignalValue {
    fn from(tree: SignalTree) -> Self {
        SignalValue::Composite(tree)
    }
}

/// Mapping from signal names to values
///
/// Keys are kept sorted so snapshots serialize deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalTree(BTreeMap<String, SignalValue>);

impl SignalTree {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert, used to assemble fixed snapshots
    pub fn with(mut self, key: &str, value: impl Into<SignalValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&SignalValue> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut SignalValue> {
        self.0.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SignalValue)> {
        self.0.iter()
    }

    /// Number of entries at this level (groups count once)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every address that resolves to a scalar leaf, in sorted order
    pub fn leaf_addresses(&self) -> Vec<String> {
        let mut addresses = Vec::new();

        for (key, value) in &self.0 {
            match value {
                SignalValue::Scalar(_) => addresses.push(key.clone()),
                SignalValue::Composite(group) => {
                    for (child, node) in group.iter() {
                        if !node.is_composite() {
                            addresses.push(format!("{}{}{}", key, ADDRESS_SEPARATOR, child));
                        }
                    }
                }
            }
        }

        addresses
    }
}
