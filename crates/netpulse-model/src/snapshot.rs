//! ---
//! np_section: "11-simulation"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Per-tick metric snapshots and class schemas."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use indexmap::IndexMap;
use netpulse_schema::{FieldKind, FieldValue};

use crate::identity::DeviceClass;
use crate::{ModelError, ModelResult};

const ACCESS_POINT_SCHEMA: &[(&str, FieldKind)] = &[
    ("status", FieldKind::Integer),
    ("client_count", FieldKind::Integer),
    ("channel_utilization_5ghz", FieldKind::Float),
    ("throughput_mbps", FieldKind::Float),
];

const SWITCH_CHASSIS_SCHEMA: &[(&str, FieldKind)] = &[
    ("cpu_utilization", FieldKind::Float),
    ("memory_utilization", FieldKind::Float),
    ("temperature_celsius", FieldKind::Float),
    ("uptime_seconds", FieldKind::Integer),
    ("fan_status", FieldKind::Integer),
    ("psu_status", FieldKind::Integer),
    ("poe_total_power_watts", FieldKind::Float),
];

const SWITCH_PORT_SCHEMA: &[(&str, FieldKind)] = &[
    ("status", FieldKind::Integer),
    ("traffic_in_bps", FieldKind::Float),
    ("traffic_out_bps", FieldKind::Float),
    ("errors_in", FieldKind::Integer),
    ("discards_out", FieldKind::Integer),
    ("poe_power_watts", FieldKind::Float),
];

const ENVIRONMENT_SCHEMA: &[(&str, FieldKind)] = &[
    ("temperature", FieldKind::Float),
    ("humidity", FieldKind::Float),
];

impl DeviceClass {
    /// Canonical field list every snapshot of this class carries, in order.
    pub fn schema(&self) -> &'static [(&'static str, FieldKind)] {
        match self {
            DeviceClass::AccessPoint => ACCESS_POINT_SCHEMA,
            DeviceClass::SwitchChassis => SWITCH_CHASSIS_SCHEMA,
            DeviceClass::SwitchPort => SWITCH_PORT_SCHEMA,
            DeviceClass::EnvironmentalSensor => ENVIRONMENT_SCHEMA,
        }
    }
}

/// Typed field values produced for one device in one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    class: DeviceClass,
    fields: IndexMap<&'static str, FieldValue>,
}

impl MetricSnapshot {
    pub fn new(class: DeviceClass) -> Self {
        Self {
            class,
            fields: IndexMap::with_capacity(class.schema().len()),
        }
    }

    /// Set a field, returning the snapshot for chaining.
    pub fn with(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.fields.get(field).copied()
    }

    /// Numeric view of a field, `0.0` when absent.
    pub fn value(&self, field: &str) -> f64 {
        self.get(field).map(|v| v.as_f64()).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        self.fields.iter().map(|(key, value)| (*key, *value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check the snapshot carries exactly its class schema with matching types.
    pub fn validate(&self) -> ModelResult<()> {
        let schema = self.class.schema();
        for (name, kind) in schema {
            match self.fields.get(name) {
                Some(value) if value.kind() == *kind => {}
                _ => {
                    return Err(ModelError::SchemaMismatch {
                        class: self.class,
                        field: (*name).to_owned(),
                    })
                }
            }
        }
        if let Some(extra) = self
            .fields
            .keys()
            .find(|key| !schema.iter().any(|(name, _)| name == *key))
        {
            return Err(ModelError::SchemaMismatch {
                class: self.class,
                field: (*extra).to_owned(),
            });
        }
        Ok(())
    }
}
