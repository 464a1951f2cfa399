//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Shared primitives and utilities for the pipeline."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! Shared primitives for the NetPulse workspace: configuration loading and
//! validation, tracing initialisation, timing helpers and build metadata.

pub mod config;
pub mod logging;
pub mod time;
pub mod version;

pub use config::{
    AccessPointsConfig, AppConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, Secret,
    SensorConfig, SimulationConfig, StoreConfig, StoreEndpoint, SwitchesConfig, WriterConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
