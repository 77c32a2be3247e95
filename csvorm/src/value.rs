//! Typed cell values and their text encoding in storage files.

use crate::schema::FieldType;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Datetime(DateTime<Utc>),
}

impl Value {
    /// Parse cell text as the given field type.
    pub fn parse(raw: &str, field_type: FieldType) -> std::result::Result<Value, String> {
        let value = match field_type {
            FieldType::String => Value::String(raw.to_string()),
            FieldType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| format!("'{raw}' is not an integer: {e}"))?,
            FieldType::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("'{raw}' is not a float: {e}"))?,
            FieldType::Boolean => {
                let trimmed = raw.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Value::Boolean(true)
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Value::Boolean(false)
                } else {
                    return Err(format!("'{raw}' is not a boolean"));
                }
            }
            FieldType::Date => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(Value::Date)
                .map_err(|e| format!("'{raw}' is not a date (YYYY-MM-DD): {e}"))?,
            FieldType::Datetime => DateTime::parse_from_rfc3339(raw.trim())
                .map(|dt| Value::Datetime(dt.with_timezone(&Utc)))
                .map_err(|e| format!("'{raw}' is not an RFC 3339 datetime: {e}"))?,
        };
        Ok(value)
    }

    /// Decode a stored cell. Text that does not parse as the declared type is
    /// kept verbatim as a string so that rewrites never lose data.
    pub(crate) fn decode(raw: &str, field_type: FieldType, field_name: &str) -> Value {
        match Value::parse(raw, field_type) {
            Ok(value) => value,
            Err(reason) => {
                log::warn!("Field '{field_name}': {reason}; keeping raw text");
                Value::String(raw.to_string())
            }
        }
    }

    /// Canonical text form written to storage files.
    pub fn render(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::Datetime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Datetime(_) => "datetime",
        }
    }

    pub fn conforms_to(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (Value::String(_), FieldType::String)
                | (Value::Integer(_), FieldType::Integer)
                | (Value::Float(_), FieldType::Float)
                | (Value::Boolean(_), FieldType::Boolean)
                | (Value::Date(_), FieldType::Date)
                | (Value::Datetime(_), FieldType::Datetime)
        )
    }

    /// Convert a caller-supplied value to the declared type, widening integers
    /// to floats. Returns `None` when the value does not fit.
    pub fn coerce(self, field_type: FieldType) -> Option<Value> {
        match (self, field_type) {
            (Value::Integer(i), FieldType::Float) => Some(Value::Float(i as f64)),
            (value, ty) if value.conforms_to(ty) => Some(value),
            _ => None,
        }
    }

    /// Natural ordering between two values of the same type. `None` for mixed
    /// types and for NaN floats.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Datetime(a), Value::Datetime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Whether this value can take part in a sort on a field of `field_type`.
    pub(crate) fn is_orderable_as(&self, field_type: FieldType) -> bool {
        match self {
            Value::Float(f) => field_type == FieldType::Float && !f.is_nan(),
            other => other.conforms_to(field_type),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Date(_) | Value::Datetime(_) => serde_json::Value::String(self.render()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Date(_) | Value::Datetime(_) => serializer.serialize_str(&self.render()),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Datetime(value)
    }
}

/// Extraction of a Rust value from a stored field value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Datetime(dt) => Some(*dt),
            _ => None,
        }
    }
}
