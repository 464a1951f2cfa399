//! ---
//! np_section: "05-networking-external-interfaces"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Metrics store and field-device clients."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! External collaborators of the pipeline: the metrics store that accepts
//! batches and the field device that serves holding registers. Both sit
//! behind async traits so the pipeline can be driven by in-memory doubles.
#![warn(missing_docs)]

pub mod device;
pub mod store;

pub use device::memory::InMemoryRegisters;
pub use device::modbus_tcp::{ModbusTcpClient, ModbusTcpConfig};
pub use device::{DeviceError, RegisterSource};
pub use store::influx::{InfluxSettings, InfluxStore};
pub use store::{MetricsStore, StoreError};
