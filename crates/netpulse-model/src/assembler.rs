//! ---
//! np_section: "11-simulation"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Snapshot to point assembly."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use netpulse_schema::Point;

use crate::identity::DeviceIdentity;
use crate::snapshot::MetricSnapshot;
use crate::{ModelError, ModelResult};

/// Combine an identity and a snapshot into a storable point.
///
/// The measurement comes from the device class, tags from the identity and
/// fields from the snapshot in schema order.
pub fn assemble(
    identity: &DeviceIdentity,
    snapshot: &MetricSnapshot,
    timestamp: DateTime<Utc>,
) -> ModelResult<Point> {
    if identity.class() != snapshot.class() {
        return Err(ModelError::ClassMismatch {
            identity: identity.class(),
            snapshot: snapshot.class(),
        });
    }
    snapshot.validate()?;

    let builder = identity.tags().fold(
        Point::builder(identity.class().measurement()),
        |builder, (key, value)| builder.tag(key, value),
    );
    let builder = snapshot
        .fields()
        .fold(builder, |builder, (key, value)| builder.field(key, value));
    Ok(builder.timestamp(timestamp).build()?)
}

/// [`assemble`] stamped with the current wall clock.
pub fn assemble_now(identity: &DeviceIdentity, snapshot: &MetricSnapshot) -> ModelResult<Point> {
    assemble(identity, snapshot, Utc::now())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use netpulse_schema::FieldValue;

    use super::*;
    use crate::identity::DeviceClass;
    use crate::sensor::EnvironmentReading;

    #[test]
    fn sensor_point_carries_identity_and_fields() {
        let identity = DeviceIdentity::environmental_sensor("server_room").unwrap();
        let snapshot = EnvironmentReading::from_registers(&[250, 455])
            .unwrap()
            .to_snapshot();
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let point = assemble(&identity, &snapshot, at).unwrap();
        assert_eq!(point.measurement(), "environment");
        assert_eq!(point.tag("location"), Some("server_room"));
        assert_eq!(point.field("temperature"), Some(FieldValue::Float(25.0)));
        assert_eq!(point.field("humidity"), Some(FieldValue::Float(45.5)));
        assert_eq!(point.timestamp(), at);
    }

    #[test]
    fn field_order_follows_schema() {
        let identity = DeviceIdentity::access_point("Lobby-AP-01", "Lobby").unwrap();
        let snapshot = MetricSnapshot::new(DeviceClass::AccessPoint)
            .with("status", 1_i64)
            .with("client_count", 12_i64)
            .with("channel_utilization_5ghz", 40.0)
            .with("throughput_mbps", 55.5);
        let point = assemble_now(&identity, &snapshot).unwrap();
        let keys: Vec<&str> = point.fields().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["status", "client_count", "channel_utilization_5ghz", "throughput_mbps"]
        );
    }

    #[test]
    fn mismatched_class_is_rejected() {
        let identity = DeviceIdentity::switch_chassis("icx8100").unwrap();
        let snapshot = EnvironmentReading::from_registers(&[1, 2]).unwrap().to_snapshot();
        assert!(matches!(
            assemble_now(&identity, &snapshot),
            Err(ModelError::ClassMismatch { .. })
        ));
    }

    #[test]
    fn incomplete_snapshot_is_rejected() {
        let identity = DeviceIdentity::environmental_sensor("server_room").unwrap();
        let snapshot = MetricSnapshot::new(DeviceClass::EnvironmentalSensor).with("temperature", 20.0);
        assert!(matches!(
            assemble_now(&identity, &snapshot),
            Err(ModelError::SchemaMismatch { .. })
        ));
    }
}
