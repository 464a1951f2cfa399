//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Simulated access point population."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use netpulse_common::AccessPointsConfig;
use netpulse_model::{assemble_now, sample_access_point, AccessPoint, ApProfile};
use netpulse_schema::Batch;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{Population, TickSample};

pub struct AccessPointPopulation {
    aps: Vec<AccessPoint>,
    profile: ApProfile,
    interval: Duration,
    rng: StdRng,
}

impl AccessPointPopulation {
    /// Name the APs and pin each to a location drawn once from `rng`.
    pub fn new(config: &AccessPointsConfig, mut rng: StdRng) -> Result<Self> {
        let mut aps = Vec::with_capacity(config.count);
        for index in 1..=config.count {
            let location = config
                .locations
                .choose(&mut rng)
                .context("access_points.locations is empty")?;
            let ap = AccessPoint::new(index, location, config.is_high_density(location))
                .with_context(|| format!("building access point {index}"))?;
            aps.push(ap);
        }
        Ok(Self {
            aps,
            profile: config.profile.clone(),
            interval: config.interval,
            rng,
        })
    }

    pub fn access_points(&self) -> &[AccessPoint] {
        &self.aps
    }
}

#[async_trait]
impl Population for AccessPointPopulation {
    fn name(&self) -> &'static str {
        "access_points"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn device_count(&self) -> usize {
        self.aps.len()
    }

    async fn sample(&mut self, _tick: u64) -> Result<TickSample> {
        let mut batch = Batch::with_capacity(self.aps.len());
        let mut offline = 0;
        let mut slow = 0;
        for ap in &self.aps {
            let reading = sample_access_point(ap, &self.profile, &mut self.rng);
            if !reading.online {
                offline += 1;
            }
            if reading.slow {
                slow += 1;
            }
            let point = assemble_now(ap.identity(), &reading.snapshot)
                .with_context(|| format!("assembling point for {}", ap.name()))?;
            batch.push(point);
        }
        Ok(TickSample {
            batch,
            devices: self.aps.len(),
            offline,
            slow,
            skipped: None,
        })
    }
}
