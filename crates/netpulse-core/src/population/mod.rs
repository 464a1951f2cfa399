//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Device populations sampled on a shared cadence."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use netpulse_schema::Batch;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

mod access_points;
mod sensor;
mod switches;

pub use access_points::AccessPointPopulation;
pub use sensor::SensorPopulation;
pub use switches::SwitchPopulation;

/// What one tick of a population produced.
#[derive(Debug, Clone, Default)]
pub struct TickSample {
    pub batch: Batch,
    pub devices: usize,
    pub offline: usize,
    pub slow: usize,
    /// Set when the tick produced nothing because a read failed.
    pub skipped: Option<String>,
}

impl TickSample {
    pub fn skipped(devices: usize, reason: impl Into<String>) -> Self {
        Self {
            devices,
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// A group of devices sampled together on one cadence.
///
/// State that must survive between ticks (uptime counters, the device
/// connection, consecutive failures) lives in the implementor and is only
/// touched by the owning task.
#[async_trait]
pub trait Population: Send {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    fn device_count(&self) -> usize;

    /// Runs once before the first tick; an error here aborts startup.
    async fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Sample every device. An error ends the population.
    async fn sample(&mut self, tick: u64) -> Result<TickSample>;
}

/// Per-population RNG. A configured seed is mixed with the population name so
/// populations draw independent but reproducible streams.
pub fn population_rng(seed: Option<u64>, name: &str) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(derive_seed(seed, name)),
        None => StdRng::from_entropy(),
    }
}

pub(crate) fn derive_seed(seed: u64, name: &str) -> u64 {
    let digest = Sha256::new()
        .chain_update(seed.to_le_bytes())
        .chain_update(name.as_bytes())
        .finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
