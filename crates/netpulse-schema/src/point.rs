//! ---
//! np_section: "02-data-model"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Shared point schema and wire encoding."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{SchemaError, SchemaResult};

/// Typed field value carried by a point.
///
/// The variant is part of the stored schema: a float that happens to be whole
/// stays a [`FieldValue::Float`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Signed integer field.
    Integer(i64),
    /// Floating point field.
    Float(f64),
    /// Boolean field.
    Boolean(bool),
}

/// Type tag of a [`FieldValue`], used for schema stability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Integer field.
    Integer,
    /// Float field.
    Float,
    /// Boolean field.
    Boolean,
}

impl FieldValue {
    /// Return the type tag of the value.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::Boolean(_) => FieldKind::Boolean,
        }
    }

    /// Numeric view of the value; booleans map to 0/1.
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Integer(value) => *value as f64,
            FieldValue::Float(value) => *value,
            FieldValue::Boolean(value) => f64::from(u8::from(*value)),
        }
    }

    /// Integer view of the value, if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether the value is zero (or `false`).
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Integer(value) => *value == 0,
            FieldValue::Float(value) => *value == 0.0,
            FieldValue::Boolean(value) => !*value,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value:?}"),
            FieldValue::Boolean(value) => write!(f, "{value}"),
        }
    }
}

/// One timestamped measurement record destined for the metrics store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: IndexMap<String, FieldValue>,
    timestamp: DateTime<Utc>,
}

impl Point {
    /// Start building a point for the given measurement.
    pub fn builder(measurement: impl Into<String>) -> PointBuilder {
        PointBuilder {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: IndexMap::new(),
            timestamp: None,
        }
    }

    /// Measurement name.
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Tag set, ordered by key.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Look up a single tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Field set in insertion order.
    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    /// Look up a single field.
    pub fn field(&self, key: &str) -> Option<FieldValue> {
        self.fields.get(key).copied()
    }

    /// Assembly timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Builder validating the point invariants on [`PointBuilder::build`].
#[derive(Debug, Clone)]
pub struct PointBuilder {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: IndexMap<String, FieldValue>,
    timestamp: Option<DateTime<Utc>>,
}

impl PointBuilder {
    /// Attach a tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Attach a typed field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Pin the timestamp; defaults to the moment of [`PointBuilder::build`].
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Validate and produce the point.
    pub fn build(self) -> SchemaResult<Point> {
        if self.measurement.trim().is_empty() {
            return Err(SchemaError::EmptyMeasurement);
        }
        check_single_line(&self.measurement, &self.tags, self.fields.keys())?;
        for (key, value) in &self.tags {
            if key.trim().is_empty() || value.trim().is_empty() {
                return Err(SchemaError::EmptyTag {
                    measurement: self.measurement.clone(),
                    key: key.clone(),
                });
            }
        }
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields(self.measurement));
        }
        for (key, value) in &self.fields {
            if key.trim().is_empty() {
                return Err(SchemaError::EmptyFieldKey(self.measurement.clone()));
            }
            if let FieldValue::Float(number) = value {
                if !number.is_finite() {
                    return Err(SchemaError::NonFiniteField {
                        measurement: self.measurement.clone(),
                        field: key.clone(),
                    });
                }
            }
        }
        Ok(Point {
            measurement: self.measurement,
            tags: self.tags,
            fields: self.fields,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        })
    }
}

/// Reject line breaks anywhere line protocol would write them verbatim.
pub(crate) fn check_single_line<'a>(
    measurement: &str,
    tags: &BTreeMap<String, String>,
    field_keys: impl IntoIterator<Item = &'a String>,
) -> SchemaResult<()> {
    let breaks = |text: &str| text.contains(|c: char| c == '\n' || c == '\r');
    let offending = if breaks(measurement) {
        Some("measurement".to_owned())
    } else {
        tags.iter()
            .find(|(key, value)| breaks(key.as_str()) || breaks(value.as_str()))
            .map(|(key, _)| key.clone())
            .or_else(|| field_keys.into_iter().find(|key| breaks(key.as_str())).cloned())
    };
    match offending {
        Some(name) => Err(SchemaError::LineBreak {
            measurement: measurement.escape_debug().to_string(),
            name: name.escape_debug().to_string(),
        }),
        None => Ok(()),
    }
}

/// Ordered set of points produced within one sampling tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    points: Vec<Point>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Append a point, preserving order.
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Number of points in the batch.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the batch holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over the points in submission order.
    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    /// Borrow the points as a slice.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Points belonging to a single measurement.
    pub fn measurement<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Point> + 'a {
        self.points
            .iter()
            .filter(move |point| point.measurement == name)
    }
}

impl Extend<Point> for Batch {
    fn extend<T: IntoIterator<Item = Point>>(&mut self, iter: T) {
        self.points.extend(iter);
    }
}

impl FromIterator<Point> for Batch {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Batch {
    type Item = Point;
    type IntoIter = std::vec::IntoIter<Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
