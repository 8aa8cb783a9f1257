//! Simulator
//!
//! Drives the random walks against the shared store:
//! - A tokio interval fires every `tick_interval_ms`
//! - Each tick applies every walk through `SignalStore::update`
//! - Signals that vanished or stopped being numeric are skipped, not fatal
//! - The loop runs for the life of the process

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use vehicle_core::{SharedStore, SignalChange};

use crate::{ProfileError, SimulationProfile, DEFAULT_TICK_INTERVAL_MS};

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Tick interval in milliseconds
    pub tick_interval_ms: u64,
    /// RNG seed for reproducible runs (entropy when unset)
    pub seed: Option<u64>,
    /// Signals to perturb
    pub profile: SimulationProfile,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            seed: None,
            profile: SimulationProfile::default(),
        }
    }
}

/// Result of one simulation tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub updated: Vec<SignalChange>,
    pub skipped: Vec<String>,
}

/// Periodic signal mutator
pub struct Simulator {
    store: SharedStore,
    profile: SimulationProfile,
    tick_interval_ms: u64,
    rng: StdRng,
    ticks: u64,
}

impl Simulator {
    /// Create a simulator over a shared store
    pub fn new(store: SharedStore, config: SimulationConfig) -> Result<Self, ProfileError> {
        config.profile.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            store,
            profile: config.profile,
            tick_interval_ms: config.tick_interval_ms.max(1),
            rng,
            ticks: 0,
        })
    }

    /// Apply every walk once
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..Default::default()
        };

        for walk in &self.profile.walks {
            let rng = &mut self.rng;
            let result = self.store.update(&walk.address, |current| {
                current.as_f64().map(|value| walk.next(value, rng))
            });

            match result {
                Ok(Some(change)) => report.updated.push(change),
                Ok(None) => {
                    warn!("Skipping {}: current value is not numeric", walk.address);
                    report.skipped.push(walk.address.clone());
                }
                Err(e) => {
                    warn!("Skipping {}: {}", walk.address, e);
                    report.skipped.push(walk.address.clone());
                }
            }
        }

        let summary = report
            .updated
            .iter()
            .map(|change| format!("{}: {}", change.address, change.new))
            .collect::<Vec<_>>()
            .join(", ");
        info!("Updated signals - {}", summary);

        report
    }

    /// Number of ticks applied so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run forever, ticking on the configured interval
    pub async fn run(mut self) {
        let mut ticker = interval(Duration::from_millis(self.tick_interval_ms));

        info!(
            "Simulator starting: {} signals every {}ms",
            self.profile.walks.len(),
            self.tick_interval_ms
        );

        loop {
            ticker.tick().await;

            let report = self.tick();
            debug!(
                "Tick {}: {} updated, {} skipped",
                report.tick,
                report.updated.len(),
                report.skipped.len()
            );
        }
    }

    /// Run on its own tokio task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
