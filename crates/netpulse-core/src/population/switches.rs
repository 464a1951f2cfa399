//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Simulated switch population."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use netpulse_common::SwitchesConfig;
use netpulse_model::{assemble_now, ChassisProfile, PortProfile, SwitchLayout, SwitchUnit};
use netpulse_schema::Batch;
use rand::rngs::StdRng;

use super::{Population, TickSample};

/// Switches with their chassis uptime counters. One chassis point plus one
/// point per port per switch per tick.
pub struct SwitchPopulation {
    units: Vec<SwitchUnit>,
    layout: SwitchLayout,
    chassis: ChassisProfile,
    ports: PortProfile,
    interval: Duration,
    rng: StdRng,
}

impl SwitchPopulation {
    pub fn new(config: &SwitchesConfig, rng: StdRng) -> Result<Self> {
        let units = config
            .names
            .iter()
            .map(|name| {
                SwitchUnit::new(name, &config.layout)
                    .with_context(|| format!("building switch {name}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            units,
            layout: config.layout.clone(),
            chassis: config.chassis.clone(),
            ports: config.ports.clone(),
            interval: config.interval,
            rng,
        })
    }

    pub fn units(&self) -> &[SwitchUnit] {
        &self.units
    }
}

#[async_trait]
impl Population for SwitchPopulation {
    fn name(&self) -> &'static str {
        "switches"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn device_count(&self) -> usize {
        self.units.len()
    }

    async fn sample(&mut self, _tick: u64) -> Result<TickSample> {
        let per_switch = 1 + self.layout.port_count as usize;
        let mut batch = Batch::with_capacity(self.units.len() * per_switch);
        for unit in &mut self.units {
            let reading = unit.tick(
                self.interval,
                &self.layout,
                &self.chassis,
                &self.ports,
                &mut self.rng,
            );
            batch.push(
                assemble_now(unit.chassis_identity(), &reading.chassis)
                    .with_context(|| format!("assembling chassis point for {}", unit.name()))?,
            );
            for port in &reading.ports {
                let identity = unit
                    .port_identity(port.port)
                    .with_context(|| format!("{} has no port {}", unit.name(), port.port))?;
                batch.push(assemble_now(identity, &port.snapshot).with_context(|| {
                    format!("assembling port point for {} port {}", unit.name(), port.port)
                })?);
            }
        }
        Ok(TickSample {
            batch,
            devices: self.units.len(),
            ..TickSample::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::population_rng;

    #[tokio::test]
    async fn each_switch_emits_chassis_and_port_points() {
        let config = SwitchesConfig::default();
        let mut population = SwitchPopulation::new(&config, population_rng(Some(3), "sw")).unwrap();
        let sample = population.sample(1).await.unwrap();
        assert_eq!(sample.batch.len(), 2 * 25);
        assert_eq!(sample.batch.measurement("switch_chassis_metrics").count(), 2);
        assert_eq!(sample.batch.measurement("switch_port_metrics").count(), 48);
    }

    #[tokio::test]
    async fn chassis_poe_matches_port_sum_each_tick() {
        let config = SwitchesConfig::default();
        let mut population = SwitchPopulation::new(&config, population_rng(Some(4), "sw")).unwrap();
        for tick in 1..=3u64 {
            let sample = population.sample(tick).await.unwrap();
            for chassis in sample.batch.measurement("switch_chassis_metrics") {
                let switch = chassis.tag("switch").unwrap();
                let port_sum: f64 = sample
                    .batch
                    .measurement("switch_port_metrics")
                    .filter(|p| p.tag("switch") == Some(switch))
                    .filter_map(|p| p.field("poe_power_watts"))
                    .map(|v| v.as_f64())
                    .sum();
                let total = chassis.field("poe_total_power_watts").unwrap().as_f64();
                assert!((total - port_sum).abs() < 0.05, "{total} vs {port_sum}");
                assert_eq!(
                    chassis.field("uptime_seconds").and_then(|v| v.as_i64()),
                    Some(60 * tick as i64)
                );
            }
        }
    }
}
