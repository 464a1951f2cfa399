//! ---
//! np_section: "02-data-model"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Shared point schema and wire encoding."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! InfluxDB line protocol encoding.
//!
//! ```text
//! measurement,tag1=a,tag2=b field1=1i,field2=2.5 1700000000000000000
//! ```
use std::fmt::Write;

use crate::point::{check_single_line, Batch, FieldValue, Point};
use crate::{SchemaError, SchemaResult};

/// Encode a whole batch, one point per line.
pub fn encode_batch(batch: &Batch) -> SchemaResult<String> {
    let mut out = String::with_capacity(batch.len() * 128);
    for point in batch {
        encode_point_into(point, &mut out)?;
        out.push('\n');
    }
    Ok(out)
}

/// Encode a single point without a trailing newline.
pub fn encode_point(point: &Point) -> SchemaResult<String> {
    let mut out = String::with_capacity(128);
    encode_point_into(point, &mut out)?;
    Ok(out)
}

fn encode_point_into(point: &Point, out: &mut String) -> SchemaResult<()> {
    // Points can also arrive through serde, which skips the builder.
    check_single_line(point.measurement(), point.tags(), point.fields().keys())?;
    let nanos = point
        .timestamp()
        .timestamp_nanos_opt()
        .ok_or_else(|| SchemaError::TimestampOutOfRange(point.measurement().to_owned()))?;

    escape_into(point.measurement(), &[',', ' '], out);
    for (key, value) in point.tags() {
        out.push(',');
        escape_into(key, &[',', '=', ' '], out);
        out.push('=');
        escape_into(value, &[',', '=', ' '], out);
    }
    out.push(' ');
    for (index, (key, value)) in point.fields().iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        escape_into(key, &[',', '=', ' '], out);
        out.push('=');
        write_field_value(value, out);
    }
    // Writing to a String cannot fail.
    let _ = write!(out, " {nanos}");
    Ok(())
}

fn write_field_value(value: &FieldValue, out: &mut String) {
    let _ = match value {
        FieldValue::Integer(number) => write!(out, "{number}i"),
        FieldValue::Float(number) => write!(out, "{number:?}"),
        FieldValue::Boolean(flag) => write!(out, "{flag}"),
    };
}

fn escape_into(raw: &str, special: &[char], out: &mut String) {
    for ch in raw.chars() {
        if ch == '\\' || special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn fixed_point() -> Point {
        Point::builder("environment")
            .tag("location", "server_room")
            .field("temperature", 25.0)
            .field("humidity", 45.5)
            .timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn floats_keep_decimal_point() {
        let line = encode_point(&fixed_point()).unwrap();
        assert_eq!(
            line,
            "environment,location=server_room temperature=25.0,humidity=45.5 1700000000000000000"
        );
    }

    #[test]
    fn integers_get_suffix_and_tags_are_sorted() {
        let point = Point::builder("switch_port_metrics")
            .tag("switch", "icx8100")
            .tag("port", "port_1")
            .field("status", 1_i64)
            .field("errors_in", 0_i64)
            .timestamp(Utc.timestamp_opt(1, 0).unwrap())
            .build()
            .unwrap();
        let line = encode_point(&point).unwrap();
        assert_eq!(
            line,
            "switch_port_metrics,port=port_1,switch=icx8100 status=1i,errors_in=0i 1000000000"
        );
    }

    #[test]
    fn special_characters_are_escaped() {
        let point = Point::builder("ap metrics")
            .tag("ap_name", "Conf Room,A=1")
            .field("status", true)
            .timestamp(Utc.timestamp_opt(0, 0).unwrap())
            .build()
            .unwrap();
        let line = encode_point(&point).unwrap();
        assert_eq!(line, r"ap\ metrics,ap_name=Conf\ Room\,A\=1 status=true 0");
    }

    #[test]
    fn deserialized_points_with_line_breaks_are_refused() {
        let json = r#"{
            "measurement": "environment",
            "tags": {"location": "server\nroom"},
            "fields": {"temperature": 25.0},
            "timestamp": "2023-11-14T22:13:20Z"
        }"#;
        let point: Point = serde_json::from_str(json).unwrap();
        let err = encode_point(&point).unwrap_err();
        assert!(matches!(err, SchemaError::LineBreak { ref name, .. } if name == "location"));
    }

    #[test]
    fn batch_is_newline_delimited() {
        let batch: Batch = vec![fixed_point(), fixed_point()].into_iter().collect();
        let body = encode_batch(&batch).unwrap();
        assert_eq!(body.lines().count(), 2);
        assert!(body.ends_with('\n'));
    }
}
