//! ---
//! np_section: "11-simulation"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Wireless access point sampler."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::identity::{DeviceClass, DeviceIdentity};
use crate::snapshot::MetricSnapshot;
use crate::{round2, ModelResult};

/// Distributions and thresholds driving the access point sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApProfile {
    /// Draws 1 for online.
    pub online: Distribution,
    pub high_density_clients: Distribution,
    pub normal_clients: Distribution,
    /// High-density APs with more clients than this draw from `busy_utilization`.
    pub busy_client_threshold: i64,
    pub busy_utilization: Distribution,
    pub normal_utilization: Distribution,
    /// Per-client throughput factor in Mbps before contention.
    pub per_client_mbps: Distribution,
    /// Utilization at which throughput reaches zero.
    pub saturation_utilization: f64,
    pub slow_utilization_threshold: f64,
    pub slow_client_floor: i64,
}

impl Default for ApProfile {
    fn default() -> Self {
        Self {
            online: Distribution::bernoulli(0.95),
            high_density_clients: Distribution::uniform_int(15, 40),
            normal_clients: Distribution::uniform_int(1, 15),
            busy_client_threshold: 20,
            busy_utilization: Distribution::uniform(50.0, 95.0),
            normal_utilization: Distribution::uniform(5.0, 50.0),
            per_client_mbps: Distribution::uniform(2.0, 10.0),
            saturation_utilization: 120.0,
            slow_utilization_threshold: 75.0,
            slow_client_floor: 5,
        }
    }
}

impl ApProfile {
    pub fn validate(&self) -> ModelResult<()> {
        self.online.validate("access_points.online")?;
        self.high_density_clients
            .validate("access_points.high_density_clients")?;
        self.normal_clients.validate("access_points.normal_clients")?;
        self.busy_utilization
            .validate("access_points.busy_utilization")?;
        self.normal_utilization
            .validate("access_points.normal_utilization")?;
        self.per_client_mbps.validate("access_points.per_client_mbps")?;
        if self.saturation_utilization.is_nan() || self.saturation_utilization <= 0.0 {
            return Err(crate::ModelError::InvalidRange {
                name: "access_points.saturation_utilization".to_owned(),
                low: 0.0,
                high: self.saturation_utilization,
            });
        }
        Ok(())
    }

    /// Slow means congested *and* loaded; a busy channel with few clients is not flagged.
    pub fn is_slow(&self, utilization: f64, clients: i64) -> bool {
        utilization > self.slow_utilization_threshold && clients > self.slow_client_floor
    }
}

/// Throughput coupled inversely to channel contention, clamped at zero.
pub fn throughput_mbps(clients: i64, per_client_mbps: f64, utilization: f64, saturation: f64) -> f64 {
    let raw = clients as f64 * per_client_mbps * (1.0 - utilization / saturation);
    raw.max(0.0)
}

/// A simulated access point with its fixed placement.
#[derive(Debug, Clone)]
pub struct AccessPoint {
    identity: DeviceIdentity,
    high_density: bool,
}

impl AccessPoint {
    /// Name follows `<location>-AP-<nn>` with a 1-based index.
    pub fn new(index: usize, location: &str, high_density: bool) -> ModelResult<Self> {
        let name = format!("{location}-AP-{index:02}");
        Ok(Self {
            identity: DeviceIdentity::access_point(name, location)?,
            high_density,
        })
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.identity.tag("ap_name").unwrap_or_default()
    }

    pub fn location(&self) -> &str {
        self.identity.tag("location").unwrap_or_default()
    }

    pub fn is_high_density(&self) -> bool {
        self.high_density
    }
}

/// One tick's result for an access point.
#[derive(Debug, Clone, PartialEq)]
pub struct ApReading {
    pub snapshot: MetricSnapshot,
    /// Offline APs are counted by the caller; the flag is not stored.
    pub online: bool,
    pub slow: bool,
}

pub fn sample_access_point<R: Rng + ?Sized>(
    ap: &AccessPoint,
    profile: &ApProfile,
    rng: &mut R,
) -> ApReading {
    let online = profile.online.sample_bool(rng);
    if !online {
        return ApReading {
            snapshot: ap_snapshot(0, 0, 0.0, 0.0),
            online: false,
            slow: false,
        };
    }

    let clients = if ap.high_density {
        profile.high_density_clients.sample_i64(rng)
    } else {
        profile.normal_clients.sample_i64(rng)
    };
    let utilization = if ap.high_density && clients > profile.busy_client_threshold {
        round2(profile.busy_utilization.sample(rng))
    } else {
        round2(profile.normal_utilization.sample(rng))
    };
    let factor = profile.per_client_mbps.sample(rng);
    let throughput = round2(throughput_mbps(
        clients,
        factor,
        utilization,
        profile.saturation_utilization,
    ));

    ApReading {
        snapshot: ap_snapshot(1, clients, utilization, throughput),
        online: true,
        slow: profile.is_slow(utilization, clients),
    }
}

fn ap_snapshot(status: i64, clients: i64, utilization: f64, throughput: f64) -> MetricSnapshot {
    MetricSnapshot::new(DeviceClass::AccessPoint)
        .with("status", status)
        .with("client_count", clients)
        .with("channel_utilization_5ghz", utilization)
        .with("throughput_mbps", throughput)
}
