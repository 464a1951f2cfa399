//! ---
//! np_section: "11-simulation"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Switch chassis and port samplers."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::identity::{DeviceClass, DeviceIdentity};
use crate::snapshot::MetricSnapshot;
use crate::{round2, ModelError, ModelResult};

/// Operational state of a switch port. The discriminant is the stored code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortStatus {
    Down = 0,
    Up = 1,
    Empty = 2,
}

impl PortStatus {
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Map a drawn code back to a status; unknown codes read as empty.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => PortStatus::Up,
            0 => PortStatus::Down,
            _ => PortStatus::Empty,
        }
    }
}

/// Physical port arrangement shared by every switch in a population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchLayout {
    pub port_count: u16,
    pub uplink_ports: Vec<u16>,
    pub poe_ports: Vec<u16>,
}

impl Default for SwitchLayout {
    fn default() -> Self {
        Self {
            port_count: 24,
            uplink_ports: vec![23, 24],
            poe_ports: (1..=12).collect(),
        }
    }
}

impl SwitchLayout {
    pub fn validate(&self) -> ModelResult<()> {
        if self.port_count == 0 {
            return Err(ModelError::InvalidLayout(
                "port_count must be at least 1".to_owned(),
            ));
        }
        for port in self.uplink_ports.iter().chain(&self.poe_ports) {
            if *port == 0 || *port > self.port_count {
                return Err(ModelError::InvalidLayout(format!(
                    "port {port} is outside 1..={}",
                    self.port_count
                )));
            }
        }
        Ok(())
    }

    pub fn ports(&self) -> impl Iterator<Item = u16> {
        1..=self.port_count
    }

    pub fn is_uplink(&self, port: u16) -> bool {
        self.uplink_ports.contains(&port)
    }

    pub fn is_poe(&self, port: u16) -> bool {
        self.poe_ports.contains(&port)
    }
}

/// Chassis health distributions; fan and PSU failures are rare independent events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisProfile {
    pub cpu_utilization: Distribution,
    pub memory_utilization: Distribution,
    pub temperature_celsius: Distribution,
    pub fan_failure: Distribution,
    pub psu_failure: Distribution,
}

impl Default for ChassisProfile {
    fn default() -> Self {
        Self {
            cpu_utilization: Distribution::uniform(10.0, 25.0),
            memory_utilization: Distribution::uniform(30.0, 45.0),
            temperature_celsius: Distribution::uniform(40.0, 55.0),
            fan_failure: Distribution::bernoulli(0.001),
            psu_failure: Distribution::bernoulli(0.001),
        }
    }
}

impl ChassisProfile {
    pub fn validate(&self) -> ModelResult<()> {
        self.cpu_utilization.validate("chassis.cpu_utilization")?;
        self.memory_utilization
            .validate("chassis.memory_utilization")?;
        self.temperature_celsius
            .validate("chassis.temperature_celsius")?;
        self.fan_failure.validate("chassis.fan_failure")?;
        self.psu_failure.validate("chassis.psu_failure")
    }
}

/// Per-port distributions; uplinks and access ports draw traffic from separate bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortProfile {
    /// Draws a [`PortStatus`] code.
    pub status: Distribution,
    pub uplink_traffic_in: Distribution,
    pub uplink_traffic_out: Distribution,
    pub access_traffic_in: Distribution,
    pub access_traffic_out: Distribution,
    pub errors_in: Distribution,
    pub discards_out: Distribution,
    pub poe_power_watts: Distribution,
}

impl Default for PortProfile {
    fn default() -> Self {
        Self {
            status: Distribution::weighted([
                (PortStatus::Up.code() as f64, 0.85),
                (PortStatus::Down.code() as f64, 0.10),
                (PortStatus::Empty.code() as f64, 0.05),
            ]),
            uplink_traffic_in: Distribution::uniform(500_000_000.0, 950_000_000.0),
            uplink_traffic_out: Distribution::uniform(200_000_000.0, 700_000_000.0),
            access_traffic_in: Distribution::uniform(1_000_000.0, 75_000_000.0),
            access_traffic_out: Distribution::uniform(500_000.0, 20_000_000.0),
            errors_in: Distribution::mostly_zero(0.98, 1, 5),
            discards_out: Distribution::mostly_zero(0.97, 1, 10),
            poe_power_watts: Distribution::uniform(5.0, 12.0),
        }
    }
}

impl PortProfile {
    pub fn validate(&self) -> ModelResult<()> {
        self.status.validate("port.status")?;
        self.uplink_traffic_in.validate("port.uplink_traffic_in")?;
        self.uplink_traffic_out.validate("port.uplink_traffic_out")?;
        self.access_traffic_in.validate("port.access_traffic_in")?;
        self.access_traffic_out.validate("port.access_traffic_out")?;
        self.errors_in.validate("port.errors_in")?;
        self.discards_out.validate("port.discards_out")?;
        self.poe_power_watts.validate("port.poe_power_watts")
    }
}

/// Monotonic uptime counter for one switch. Only ever advanced, never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UptimeCounter {
    seconds: u64,
}

impl UptimeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one tick interval, saturating instead of wrapping.
    pub fn advance(&mut self, interval: Duration) -> u64 {
        self.seconds = self.seconds.saturating_add(interval.as_secs());
        self.seconds
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }
}

/// One port's result for a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PortReading {
    pub port: u16,
    pub status: PortStatus,
    pub snapshot: MetricSnapshot,
}

impl PortReading {
    pub fn poe_watts(&self) -> f64 {
        self.snapshot.value("poe_power_watts")
    }
}

/// Everything one switch produced in a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchReading {
    pub chassis: MetricSnapshot,
    pub ports: Vec<PortReading>,
    pub poe_total_watts: f64,
}

/// Draw one port snapshot. Only up ports carry traffic, errors and PoE draw.
pub fn sample_port<R: Rng + ?Sized>(
    port: u16,
    layout: &SwitchLayout,
    profile: &PortProfile,
    rng: &mut R,
) -> PortReading {
    let status = PortStatus::from_code(profile.status.sample_i64(rng));
    let mut traffic_in = 0.0;
    let mut traffic_out = 0.0;
    let mut errors = 0;
    let mut discards = 0;
    let mut poe = 0.0;

    if status == PortStatus::Up {
        if layout.is_uplink(port) {
            traffic_in = profile.uplink_traffic_in.sample(rng);
            traffic_out = profile.uplink_traffic_out.sample(rng);
        } else {
            traffic_in = profile.access_traffic_in.sample(rng);
            traffic_out = profile.access_traffic_out.sample(rng);
        }
        errors = profile.errors_in.sample_i64(rng);
        discards = profile.discards_out.sample_i64(rng);
        if layout.is_poe(port) {
            poe = round2(profile.poe_power_watts.sample(rng));
        }
    }

    let snapshot = MetricSnapshot::new(DeviceClass::SwitchPort)
        .with("status", status.code())
        .with("traffic_in_bps", traffic_in)
        .with("traffic_out_bps", traffic_out)
        .with("errors_in", errors)
        .with("discards_out", discards)
        .with("poe_power_watts", poe);
    PortReading {
        port,
        status,
        snapshot,
    }
}

/// Total PoE draw for one tick, summed over the PoE-capable ports only.
pub fn poe_total(layout: &SwitchLayout, ports: &[PortReading]) -> f64 {
    round2(
        ports
            .iter()
            .filter(|reading| layout.is_poe(reading.port))
            .map(PortReading::poe_watts)
            .sum(),
    )
}

pub fn sample_chassis<R: Rng + ?Sized>(
    profile: &ChassisProfile,
    uptime_seconds: u64,
    poe_total_watts: f64,
    rng: &mut R,
) -> MetricSnapshot {
    let cpu = round2(profile.cpu_utilization.sample(rng));
    let memory = round2(profile.memory_utilization.sample(rng));
    let temperature = round2(profile.temperature_celsius.sample(rng));
    let fan_ok = !profile.fan_failure.sample_bool(rng);
    let psu_ok = !profile.psu_failure.sample_bool(rng);
    MetricSnapshot::new(DeviceClass::SwitchChassis)
        .with("cpu_utilization", cpu)
        .with("memory_utilization", memory)
        .with("temperature_celsius", temperature)
        .with("uptime_seconds", i64::try_from(uptime_seconds).unwrap_or(i64::MAX))
        .with("fan_status", i64::from(fan_ok))
        .with("psu_status", i64::from(psu_ok))
        .with("poe_total_power_watts", poe_total_watts)
}

/// A simulated switch: chassis and port identities plus its uptime state.
#[derive(Debug, Clone)]
pub struct SwitchUnit {
    chassis: DeviceIdentity,
    ports: Vec<(u16, DeviceIdentity)>,
    uptime: UptimeCounter,
}

impl SwitchUnit {
    pub fn new(name: &str, layout: &SwitchLayout) -> ModelResult<Self> {
        let chassis = DeviceIdentity::switch_chassis(name)?;
        let ports = layout
            .ports()
            .map(|port| DeviceIdentity::switch_port(name, port).map(|id| (port, id)))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Self {
            chassis,
            ports,
            uptime: UptimeCounter::new(),
        })
    }

    pub fn name(&self) -> &str {
        self.chassis.tag("switch").unwrap_or_default()
    }

    pub fn chassis_identity(&self) -> &DeviceIdentity {
        &self.chassis
    }

    pub fn port_identity(&self, port: u16) -> Option<&DeviceIdentity> {
        self.ports
            .iter()
            .find(|(number, _)| *number == port)
            .map(|(_, identity)| identity)
    }

    pub fn uptime(&self) -> u64 {
        self.uptime.seconds()
    }

    /// Advance uptime by one interval, then sample every port and the chassis.
    ///
    /// Ports are drawn first so the chassis PoE total reflects this tick only.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        interval: Duration,
        layout: &SwitchLayout,
        chassis_profile: &ChassisProfile,
        port_profile: &PortProfile,
        rng: &mut R,
    ) -> SwitchReading {
        let uptime = self.uptime.advance(interval);
        let ports: Vec<PortReading> = self
            .ports
            .iter()
            .map(|(port, _)| sample_port(*port, layout, port_profile, rng))
            .collect();
        let poe_total_watts = poe_total(layout, &ports);
        let chassis = sample_chassis(chassis_profile, uptime, poe_total_watts, rng);
        SwitchReading {
            chassis,
            ports,
            poe_total_watts,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn uptime_advances_by_exactly_one_interval() {
        let layout = SwitchLayout::default();
        let mut unit = SwitchUnit::new("icx8100", &layout).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let interval = Duration::from_secs(60);
        let mut previous = unit.uptime();
        for tick in 1..=5_u64 {
            let reading = unit.tick(
                interval,
                &layout,
                &ChassisProfile::default(),
                &PortProfile::default(),
                &mut rng,
            );
            let uptime = reading.chassis.get("uptime_seconds").unwrap().as_i64().unwrap();
            assert_eq!(uptime as u64, previous + 60);
            assert_eq!(uptime as u64, tick * 60);
            previous = uptime as u64;
        }
    }

    #[test]
    fn uptime_saturates() {
        let mut counter = UptimeCounter { seconds: u64::MAX - 1 };
        assert_eq!(counter.advance(Duration::from_secs(60)), u64::MAX);
        assert_eq!(counter.advance(Duration::from_secs(60)), u64::MAX);
    }

    #[test]
    fn poe_total_is_recomputed_each_tick() {
        let layout = SwitchLayout::default();
        let mut unit = SwitchUnit::new("icx8200", &layout).unwrap();
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..20 {
            let reading = unit.tick(
                Duration::from_secs(60),
                &layout,
                &ChassisProfile::default(),
                &PortProfile::default(),
                &mut rng,
            );
            let expected: f64 = reading
                .ports
                .iter()
                .filter(|p| layout.is_poe(p.port))
                .map(|p| p.snapshot.value("poe_power_watts"))
                .sum();
            assert!((reading.poe_total_watts - expected).abs() < 0.01);
            assert_eq!(
                reading.chassis.value("poe_total_power_watts"),
                reading.poe_total_watts
            );
            // Twelve PoE ports at most 12 W each bounds a single tick.
            assert!(reading.poe_total_watts <= 144.0);
            reading.chassis.validate().unwrap();
        }
    }

    #[test]
    fn idle_ports_carry_no_traffic() {
        let layout = SwitchLayout::default();
        let mut rng = StdRng::seed_from_u64(4);
        for status in [PortStatus::Down, PortStatus::Empty] {
            let profile = PortProfile {
                status: Distribution::weighted([(status.code() as f64, 1.0)]),
                ..PortProfile::default()
            };
            for port in layout.ports() {
                let reading = sample_port(port, &layout, &profile, &mut rng);
                assert_eq!(reading.status, status);
                for field in [
                    "traffic_in_bps",
                    "traffic_out_bps",
                    "errors_in",
                    "discards_out",
                    "poe_power_watts",
                ] {
                    assert!(reading.snapshot.get(field).unwrap().is_zero(), "{field}");
                }
                reading.snapshot.validate().unwrap();
            }
        }
    }

    #[test]
    fn up_ports_respect_traffic_bands() {
        let layout = SwitchLayout::default();
        let profile = PortProfile {
            status: Distribution::weighted([(1.0, 1.0)]),
            ..PortProfile::default()
        };
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..50 {
            for port in layout.ports() {
                let reading = sample_port(port, &layout, &profile, &mut rng);
                let inbound = reading.snapshot.value("traffic_in_bps");
                let outbound = reading.snapshot.value("traffic_out_bps");
                if layout.is_uplink(port) {
                    assert!((500e6..=950e6).contains(&inbound));
                    assert!((200e6..=700e6).contains(&outbound));
                } else {
                    assert!((1e6..=75e6).contains(&inbound));
                    assert!((0.5e6..=20e6).contains(&outbound));
                }
                let poe = reading.poe_watts();
                if layout.is_poe(port) {
                    assert!((5.0..=12.0).contains(&poe));
                } else {
                    assert_eq!(poe, 0.0);
                }
            }
        }
        assert!(profile.uplink_traffic_in.support().0 > profile.access_traffic_in.support().1);
    }

    #[test]
    fn layout_validation_catches_out_of_range_ports() {
        let layout = SwitchLayout {
            port_count: 8,
            uplink_ports: vec![9],
            poe_ports: vec![],
        };
        assert!(layout.validate().is_err());
        assert!(SwitchLayout::default().validate().is_ok());
    }
}
