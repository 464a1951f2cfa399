//! ---
//! np_section: "11-simulation"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Device identities and measurement naming."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult};

/// Device classes known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    AccessPoint,
    SwitchChassis,
    SwitchPort,
    EnvironmentalSensor,
}

impl DeviceClass {
    /// Measurement name used when the class is written to the store.
    pub fn measurement(&self) -> &'static str {
        match self {
            DeviceClass::AccessPoint => "ruckus_ap_metrics",
            DeviceClass::SwitchChassis => "switch_chassis_metrics",
            DeviceClass::SwitchPort => "switch_port_metrics",
            DeviceClass::EnvironmentalSensor => "environment",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::AccessPoint => "access_point",
            DeviceClass::SwitchChassis => "switch_chassis",
            DeviceClass::SwitchPort => "switch_port",
            DeviceClass::EnvironmentalSensor => "environmental_sensor",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identity of one device; its tags become the point tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    class: DeviceClass,
    tags: IndexMap<&'static str, String>,
}

impl DeviceIdentity {
    fn build(class: DeviceClass, tags: Vec<(&'static str, String)>) -> ModelResult<Self> {
        let mut map = IndexMap::with_capacity(tags.len());
        for (key, value) in tags {
            let value = value.trim().to_owned();
            if value.is_empty() {
                return Err(ModelError::EmptyTag { class, key });
            }
            map.insert(key, value);
        }
        Ok(Self { class, tags: map })
    }

    pub fn access_point(ap_name: impl Into<String>, location: impl Into<String>) -> ModelResult<Self> {
        Self::build(
            DeviceClass::AccessPoint,
            vec![("ap_name", ap_name.into()), ("location", location.into())],
        )
    }

    pub fn switch_chassis(switch: impl Into<String>) -> ModelResult<Self> {
        Self::build(DeviceClass::SwitchChassis, vec![("switch", switch.into())])
    }

    pub fn switch_port(switch: impl Into<String>, port: u16) -> ModelResult<Self> {
        Self::build(
            DeviceClass::SwitchPort,
            vec![("switch", switch.into()), ("port", format!("port_{port}"))],
        )
    }

    pub fn environmental_sensor(location: impl Into<String>) -> ModelResult<Self> {
        Self::build(
            DeviceClass::EnvironmentalSensor,
            vec![("location", location.into())],
        )
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn tags(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.tags.iter().map(|(key, value)| (*key, value.as_str()))
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Short human-readable label for logs.
    pub fn label(&self) -> String {
        self.tags
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }
}
