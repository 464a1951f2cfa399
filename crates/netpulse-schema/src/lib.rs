//! ---
//! np_section: "02-data-model"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Shared point schema and wire encoding."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! Measurement schema for the NetPulse pipeline.
//!
//! A [`Point`] is one timestamped record (measurement name, tag set, typed
//! field set) and a [`Batch`] is the ordered set of points produced by one
//! sampling tick. Batches encode to InfluxDB line protocol through
//! [`line_protocol`].
#![warn(missing_docs)]

pub mod line_protocol;
pub mod point;

pub use line_protocol::encode_batch;
pub use point::{Batch, FieldKind, FieldValue, Point, PointBuilder};

/// Shared result type for schema validation routines.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while building or encoding points.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Measurement names must be non-empty.
    #[error("measurement name cannot be empty")]
    EmptyMeasurement,
    /// Tag keys and values must be non-empty.
    #[error("tag '{key}' on measurement '{measurement}' has an empty key or value")]
    EmptyTag {
        /// Measurement the tag belongs to.
        measurement: String,
        /// Offending tag key (may itself be empty).
        key: String,
    },
    /// A point must carry at least one field.
    #[error("measurement '{0}' has no fields")]
    NoFields(String),
    /// Field keys must be non-empty.
    #[error("measurement '{0}' has a field with an empty key")]
    EmptyFieldKey(String),
    /// Float fields must be finite; the store rejects NaN and infinities.
    #[error("field '{field}' on measurement '{measurement}' is not a finite number")]
    NonFiniteField {
        /// Measurement the field belongs to.
        measurement: String,
        /// Offending field key.
        field: String,
    },
    /// Line protocol has no escape for line breaks in names or tag values.
    #[error("'{name}' on measurement '{measurement}' contains a line break")]
    LineBreak {
        /// Measurement the offending name or value belongs to.
        measurement: String,
        /// Tag or field key, or `measurement` for the measurement name.
        name: String,
    },
    /// The point timestamp cannot be represented in nanoseconds since the epoch.
    #[error("timestamp for measurement '{0}' is outside the nanosecond range")]
    TimestampOutOfRange(String),
}
