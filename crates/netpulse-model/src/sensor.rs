//! ---
//! np_section: "11-simulation"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Environmental sensor register decoding."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use crate::identity::DeviceClass;
use crate::snapshot::MetricSnapshot;
use crate::{ModelError, ModelResult};

/// Raw registers hold tenths of a unit.
pub const REGISTER_SCALE: f64 = 10.0;

/// Number of consecutive registers a reading needs: temperature then humidity.
pub const REGISTER_COUNT: usize = 2;

/// Scaled temperature (°C) and relative humidity (%) from one register read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentReading {
    pub temperature: f64,
    pub humidity: f64,
}

impl EnvironmentReading {
    /// Decode the first two registers. Extra trailing registers are ignored.
    pub fn from_registers(registers: &[u16]) -> ModelResult<Self> {
        match registers {
            [temperature, humidity, ..] => Ok(Self {
                temperature: f64::from(*temperature) / REGISTER_SCALE,
                humidity: f64::from(*humidity) / REGISTER_SCALE,
            }),
            _ => Err(ModelError::MissingRegisters {
                expected: REGISTER_COUNT,
                actual: registers.len(),
            }),
        }
    }

    pub fn to_snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::new(DeviceClass::EnvironmentalSensor)
            .with("temperature", self.temperature)
            .with("humidity", self.humidity)
    }
}
