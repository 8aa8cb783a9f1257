//! Simulation profiles
//!
//! A profile lists the signals the simulator perturbs and how. Profiles are
//! either built in or loaded from TOML:
//!
//! ```toml
//! [[walk]]
//! address = "VehicleSpeed"
//! step = 5.0
//! min = 0.0
//! max = 120.0
//! output = "float"
//! decimals = 1
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use vehicle_core::Scalar;

/// Errors from loading or validating a profile
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read profile: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse profile: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid walk for {address}: {reason}")]
    Invalid { address: String, reason: String },
}

/// How a walked value is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WalkOutput {
    /// Float rounded to `decimals` places
    #[default]
    Float,
    /// Integer, fractional part truncated
    Integer,
}

/// Most decimal places a float walk may round to
pub const MAX_DECIMALS: u32 = 15;

fn default_decimals() -> u32 {
    1
}

/// Bounded random walk for one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Walk {
    pub address: String,
    /// Largest change per tick, in either direction
    pub step: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub output: WalkOutput,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

impl Walk {
    pub fn float(address: &str, step: f64, min: f64, max: f64) -> Self {
        Self {
            address: address.to_string(),
            step,
            min,
            max,
            output: WalkOutput::Float,
            decimals: default_decimals(),
        }
    }

    pub fn integer(address: &str, step: f64, min: f64, max: f64) -> Self {
        Self {
            output: WalkOutput::Integer,
            ..Self::float(address, step, min, max)
        }
    }

    /// Next value: `clamp(current + uniform(-step, step), min, max)`
    pub fn next<R: Rng>(&self, current: f64, rng: &mut R) -> Scalar {
        let delta = if self.step > 0.0 {
            rng.gen_range(-self.step..=self.step)
        } else {
            0.0
        };
        // A non-finite current value restarts the walk at its lower bound
        let current = if current.is_finite() { current } else { self.min };
        let raw = (current + delta).clamp(self.min, self.max);

        match self.output {
            WalkOutput::Float => {
                let scale = 10f64.powi(self.decimals.min(MAX_DECIMALS) as i32);
                let rounded = (raw * scale).round() / scale;
                // Near the edge of the f64 range the scaled value overflows
                let value = if rounded.is_finite() { rounded } else { raw };
                Scalar::Float(value.clamp(self.min, self.max))
            }
            WalkOutput::Integer => {
                Scalar::Int(raw.trunc().clamp(self.min.ceil(), self.max.floor()) as i64)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let invalid = |reason: &str| ProfileError::Invalid {
            address: self.address.clone(),
            reason: reason.to_string(),
        };

        if self.address.is_empty() {
            return Err(invalid("address is empty"));
        }
        if !self.min.is_finite() || !self.max.is_finite() || !self.step.is_finite() {
            return Err(invalid("bounds and step must be finite"));
        }
        if self.min > self.max {
            return Err(invalid("min is greater than max"));
        }
        if self.step < 0.0 {
            return Err(invalid("step is negative"));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(invalid("decimals must be at most 15"));
        }
        if self.output == WalkOutput::Integer && self.min.ceil() > self.max.floor() {
            return Err(invalid("no integer lies between min and max"));
        }

        Ok(())
    }
}

/// The set of walks applied on every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    #[serde(rename = "walk", default)]
    pub walks: Vec<Walk>,
}

impl SimulationProfile {
    pub fn from_toml_str(content: &str) -> Result<Self, ProfileError> {
        let profile: Self = toml::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        self.walks.iter().try_for_each(Walk::validate)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.walks.iter().map(|w| w.address.as_str())
    }
}

impl Default for SimulationProfile {
    /// Speed, engine RPM and outside temperature, as on the demo vehicle
    fn default() -> Self {
        Self {
            walks: vec![
                Walk::float("VehicleSpeed", 5.0, 0.0, 120.0),
                Walk::integer("EngineRPM", 200.0, 700.0, 5000.0),
                Walk::float("OutsideTemperature", 0.5, -10.0, 40.0),
            ],
        }
    }
}
