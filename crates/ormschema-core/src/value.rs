//! Dynamic values flowing between model instances and schema instances.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use crate::schema::{DumpOptions, SchemaInstance};

/// A dynamically-typed value.
///
/// Inputs (keyword arguments, JSON documents, model attributes) are converted
/// into `Value`s, coerced to a field's declared type, and stored on a
/// [`SchemaInstance`]. Validated nested schemas are stored as [`Value::Record`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Arbitrary precision decimal.
    Decimal(Decimal),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without offset.
    DateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
    /// Time interval.
    Duration(TimeDelta),
    /// UUID.
    Uuid(Uuid),
    /// Parsed JSON document.
    Json(serde_json::Value),
    /// Sequence of values.
    List(Vec<Value>),
    /// Unvalidated key/value mapping (input side of nested schemas).
    Map(BTreeMap<String, Value>),
    /// Validated nested schema instance.
    Record(Box<SchemaInstance>),
}

impl Value {
    /// Check if this value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's variant, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Time(_) => "time",
            Value::Duration(_) => "timedelta",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Record(_) => "schema",
        }
    }

    /// Borrow as a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read as an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Read as a float, widening integers.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Read as a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as a nested schema instance.
    #[must_use]
    pub fn as_record(&self) -> Option<&SchemaInstance> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Convert a JSON document into a value tree.
    ///
    /// Objects become [`Value::Map`] so they can later be validated against a
    /// nested schema.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float))
                .unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Encode as JSON.
    ///
    /// Dates and times use ISO 8601, durations become total seconds, decimals
    /// become numbers, bytes are decoded as UTF-8 (lossy).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(f) => float_to_json(*f),
            Value::Decimal(d) => d.to_f64().map_or(Json::Null, float_to_json),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
            Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => Json::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::Time(t) => Json::String(t.format("%H:%M:%S%.f").to_string()),
            Value::Duration(d) => float_to_json(duration_seconds(*d)),
            Value::Uuid(u) => Json::String(u.hyphenated().to_string()),
            Value::Json(j) => j.clone(),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Record(record) => record.dump(&DumpOptions::default()),
        }
    }

    /// Python-like literal used when rendering signatures.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Value::Null => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Text(s) => format!("'{s}'"),
            other => other.to_json().to_string(),
        }
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Total seconds of a duration, including the fractional part.
#[must_use]
pub fn duration_seconds(d: TimeDelta) -> f64 {
    d.num_seconds() as f64 + f64::from(d.subsec_nanos()) / 1_000_000_000.0
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_object_becomes_map() {
        let json = serde_json::json!({"id": 1, "name": "x", "tags": [1.5, null]});
        let value = Value::from_json(&json);
        let Value::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map["id"], Value::Int(1));
        assert_eq!(map["name"], Value::Text("x".to_string()));
        assert_eq!(map["tags"], Value::List(vec![Value::Float(1.5), Value::Null]));
    }

    #[test]
    fn test_to_json_temporal_values() {
        let date = NaiveDate::from_ymd_opt(2022, 7, 6).unwrap();
        assert_eq!(Value::Date(date).to_json(), serde_json::json!("2022-07-06"));

        let dt = date.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(Value::DateTime(dt).to_json(), serde_json::json!("2022-07-06T10:30:00"));

        let d = TimeDelta::milliseconds(1500);
        assert_eq!(Value::Duration(d).to_json(), serde_json::json!(1.5));
    }

    #[test]
    fn test_repr_matches_python_literals() {
        assert_eq!(Value::Null.repr(), "None");
        assert_eq!(Value::Bool(true).repr(), "True");
        assert_eq!(Value::from("2").repr(), "'2'");
        assert_eq!(Value::Int(3).repr(), "3");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".to_string()));
    }
}
