//! ---
//! np_section: "11-simulation"
//! np_subsection: "01-bootstrap"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Device model exports and shared types."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! Device models for the NetPulse pipeline.
//!
//! Every sampler here is a plain function of a device identity, a profile of
//! [`Distribution`] descriptors and a caller-owned RNG (or, for the sensor, a
//! register read). Nothing in this crate performs I/O or keeps global state;
//! the only cross-tick state, switch uptime, lives in [`UptimeCounter`] owned
//! by the caller.

pub mod access_point;
pub mod assembler;
pub mod distribution;
pub mod identity;
pub mod sensor;
pub mod snapshot;
pub mod switch;

pub use access_point::{sample_access_point, AccessPoint, ApProfile, ApReading};
pub use assembler::{assemble, assemble_now};
pub use distribution::{Distribution, WeightedOutcome};
pub use identity::{DeviceClass, DeviceIdentity};
pub use sensor::{EnvironmentReading, REGISTER_SCALE};
pub use snapshot::MetricSnapshot;
pub use switch::{
    ChassisProfile, PortProfile, PortReading, PortStatus, SwitchLayout, SwitchReading, SwitchUnit,
    UptimeCounter,
};

/// Shared result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by distribution validation, identity construction and
/// snapshot checks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("distribution '{name}': probability {value} is outside [0, 1]")]
    InvalidProbability { name: String, value: f64 },
    #[error("distribution '{name}': range [{low}, {high}] is empty or not finite")]
    InvalidRange { name: String, low: f64, high: f64 },
    #[error("distribution '{name}': invalid weights: {reason}")]
    InvalidWeights { name: String, reason: String },
    #[error("{class} identity has an empty '{key}' tag")]
    EmptyTag { class: DeviceClass, key: &'static str },
    #[error("{class} snapshot field mismatch at '{field}'")]
    SchemaMismatch { class: DeviceClass, field: String },
    #[error("snapshot class {snapshot} does not match identity class {identity}")]
    ClassMismatch {
        identity: DeviceClass,
        snapshot: DeviceClass,
    },
    #[error("expected {expected} registers, device returned {actual}")]
    MissingRegisters { expected: usize, actual: usize },
    #[error("switch layout: {0}")]
    InvalidLayout(String),
    #[error(transparent)]
    Schema(#[from] netpulse_schema::SchemaError),
}

/// Round to two decimals, matching how the simulators report derived values.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
