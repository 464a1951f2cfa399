//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Environmental sensor population polled over a register source."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use netpulse_common::SensorConfig;
use netpulse_logging::{np_warn, LogContext};
use netpulse_model::{assemble_now, DeviceIdentity, EnvironmentReading};
use netpulse_net::RegisterSource;
use netpulse_schema::Batch;

use super::{Population, TickSample};

/// The real sensor. A failed connect in [`Population::prepare`] is fatal; a
/// failed read afterwards only skips the tick.
pub struct SensorPopulation {
    source: Box<dyn RegisterSource>,
    identity: DeviceIdentity,
    interval: Duration,
    start_register: u16,
    register_count: u16,
    max_consecutive_failures: Option<u32>,
    consecutive_failures: u32,
}

impl SensorPopulation {
    pub fn new(config: &SensorConfig, source: Box<dyn RegisterSource>) -> Result<Self> {
        let identity = DeviceIdentity::environmental_sensor(config.location.clone())
            .context("building sensor identity")?;
        Ok(Self {
            source,
            identity,
            interval: config.interval,
            start_register: config.start_register,
            register_count: config.register_count,
            max_consecutive_failures: config.max_consecutive_failures,
            consecutive_failures: 0,
        })
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    async fn read(&mut self) -> Result<EnvironmentReading> {
        let registers = self
            .source
            .read_holding_registers(self.start_register, self.register_count)
            .await?;
        Ok(EnvironmentReading::from_registers(&registers)?)
    }
}

#[async_trait]
impl Population for SensorPopulation {
    fn name(&self) -> &'static str {
        "sensor"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn device_count(&self) -> usize {
        1
    }

    async fn prepare(&mut self) -> Result<()> {
        let endpoint = self.source.endpoint();
        self.source
            .connect()
            .await
            .with_context(|| format!("connecting to sensor at {endpoint}"))
    }

    async fn sample(&mut self, tick: u64) -> Result<TickSample> {
        match self.read().await {
            Ok(reading) => {
                self.consecutive_failures = 0;
                let point = assemble_now(&self.identity, &reading.to_snapshot())
                    .context("assembling sensor point")?;
                Ok(TickSample {
                    batch: std::iter::once(point).collect::<Batch>(),
                    devices: 1,
                    ..TickSample::default()
                })
            }
            Err(err) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                let ctx = LogContext::population(self.name()).with_tick(tick);
                np_warn!(
                    context = ctx,
                    "sensor read failed ({} in a row): {err:#}",
                    self.consecutive_failures
                );
                if let Some(limit) = self.max_consecutive_failures {
                    if self.consecutive_failures >= limit {
                        bail!(
                            "sensor at {} failed {} consecutive reads: {err:#}",
                            self.source.endpoint(),
                            self.consecutive_failures
                        );
                    }
                }
                Ok(TickSample::skipped(1, format!("{err:#}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use netpulse_net::InMemoryRegisters;
    use netpulse_testharness::{ScriptedRead, ScriptedRegisterSource};

    use super::*;

    #[tokio::test]
    async fn registers_are_scaled_into_an_environment_point() {
        let source = InMemoryRegisters::with_values("env", 0, &[250, 455]);
        let mut population =
            SensorPopulation::new(&SensorConfig::new("127.0.0.1"), Box::new(source)).unwrap();
        population.prepare().await.unwrap();
        let sample = population.sample(1).await.unwrap();
        let point = sample.batch.iter().next().unwrap();
        assert_eq!(point.measurement(), "environment");
        assert_eq!(point.tag("location"), Some("server_room"));
        assert_eq!(point.field("temperature").map(|v| v.as_f64()), Some(25.0));
        assert_eq!(point.field("humidity").map(|v| v.as_f64()), Some(45.5));
    }

    #[tokio::test]
    async fn read_errors_skip_the_tick_and_recover() {
        let source = ScriptedRegisterSource::new([
            ScriptedRead::Timeout,
            ScriptedRead::Values(vec![1]),
            ScriptedRead::Values(vec![210, 400]),
        ]);
        let mut population =
            SensorPopulation::new(&SensorConfig::new("127.0.0.1"), Box::new(source)).unwrap();
        for tick in 1..=2 {
            let sample = population.sample(tick).await.unwrap();
            assert!(sample.skipped.is_some());
            assert!(sample.batch.is_empty());
        }
        assert_eq!(population.consecutive_failures(), 2);
        let sample = population.sample(3).await.unwrap();
        assert_eq!(sample.batch.len(), 1);
        assert_eq!(population.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn escalates_after_configured_consecutive_failures() {
        let mut config = SensorConfig::new("127.0.0.1");
        config.max_consecutive_failures = Some(2);
        let source = ScriptedRegisterSource::new(std::iter::empty())
            .with_fallback(ScriptedRead::Disconnected);
        let mut population = SensorPopulation::new(&config, Box::new(source)).unwrap();
        assert!(population.sample(1).await.is_ok());
        let err = population.sample(2).await.unwrap_err();
        assert!(format!("{err:#}").contains("2 consecutive reads"));
    }

    #[tokio::test]
    async fn failure_streak_saturates_without_escalation() {
        let source = ScriptedRegisterSource::new(std::iter::empty());
        let mut population =
            SensorPopulation::new(&SensorConfig::new("127.0.0.1"), Box::new(source)).unwrap();
        population.consecutive_failures = u32::MAX - 1;
        for tick in 1..=3 {
            let sample = population.sample(tick).await.unwrap();
            assert!(sample.skipped.is_some());
        }
        assert_eq!(population.consecutive_failures(), u32::MAX);
    }

    #[tokio::test]
    async fn connect_failure_is_fatal() {
        let mut population = SensorPopulation::new(
            &SensorConfig::new("127.0.0.1"),
            Box::new(ScriptedRegisterSource::unreachable()),
        )
        .unwrap();
        let err = population.prepare().await.unwrap_err();
        assert!(format!("{err:#}").contains("scripted://sensor"));
    }
}
