//! Record coercion and conformance

use super::types::{FieldType, StreamSchema};
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use tracing::trace;

/// Parse a replication-key style timestamp.
///
/// Accepts RFC 3339 date-times and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Convert string-encoded integers in `fields` to JSON integers.
///
/// Integers and nulls pass through unchanged, so running this twice is a
/// no-op. Anything else is a fatal coercion error.
pub fn coerce_integer_fields(stream: &str, mut record: Value, fields: &[&str]) -> Result<Value> {
    let Some(obj) = record.as_object_mut() else {
        return Ok(record);
    };

    for &field in fields {
        let Some(value) = obj.get_mut(field) else {
            continue;
        };

        let coerced = match &*value {
            Value::Null => continue,
            Value::Number(n) if n.is_i64() || n.is_u64() => continue,
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        };

        match coerced {
            Some(v) => *value = v,
            None => {
                return Err(Error::Coercion {
                    stream: stream.to_string(),
                    field: field.to_string(),
                    value: value.to_string(),
                })
            }
        }
    }

    Ok(record)
}

/// Project a raw record onto the schema and type-check it.
///
/// Undeclared fields are dropped. Declared fields must be null or match
/// their type, and the replication key must carry a non-null value.
pub fn conform(
    stream: &str,
    schema: &StreamSchema,
    replication_key: &str,
    record: Value,
) -> Result<Value> {
    let raw = match record {
        Value::Object(map) => map,
        other => {
            return Err(Error::schema(
                stream,
                format!("expected a JSON object, got {other}"),
            ))
        }
    };

    let mut out = Map::new();
    for (name, value) in raw {
        let Some(field_type) = schema.field_type(&name) else {
            trace!(stream, field = %name, "dropping undeclared field");
            continue;
        };
        if !value.is_null() && !matches_type(&value, field_type) {
            return Err(Error::schema(
                stream,
                format!("field '{name}' expected {field_type}, got {value}"),
            ));
        }
        out.insert(name, value);
    }

    if out.get(replication_key).map_or(true, Value::is_null) {
        return Err(Error::MissingReplicationKey {
            stream: stream.to_string(),
            key: replication_key.to_string(),
        });
    }

    Ok(Value::Object(out))
}

fn matches_type(value: &Value, field_type: FieldType) -> bool {
    match field_type {
        FieldType::String => value.is_string(),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::Number => value.is_number(),
        FieldType::Timestamp => value.as_str().and_then(parse_timestamp).is_some(),
    }
}
