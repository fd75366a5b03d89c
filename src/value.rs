//! Loosely typed parameter values
//!
//! Raw request parameters arrive as JSON (body) or strings (query). The engine
//! works on [`Value`], which covers everything JSON can express plus the two
//! shapes produced by conversion: timestamps and enum members.
//!
//! Maps are ordered (`BTreeMap`) so sanitized output and error reports
//! serialize deterministically.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Ordered mapping of parameter name to value.
pub type Params = BTreeMap<String, Value>;

/// Serialization format for timestamps in sanitized output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A member of a declared enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// Name of the enumeration (e.g. "FeedbackType")
    pub enum_name: &'static str,
    /// Variant name (e.g. "review")
    pub variant: String,
}

impl EnumValue {
    pub fn new(enum_name: &'static str, variant: impl Into<String>) -> Self {
        Self {
            enum_name,
            variant: variant.into(),
        }
    }
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(NaiveDateTime),
    Enum(EnumValue),
    List(Vec<Value>),
    Map(Params),
}

impl Value {
    /// Returns the type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Params> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Converts a JSON value. Integers that fit `i64` become `Int`,
    /// every other number becomes `Float`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts back to JSON for responses and persistence.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(ts) => {
                serde_json::Value::String(ts.format(TIMESTAMP_FORMAT).to_string())
            }
            Value::Enum(e) => serde_json::Value::String(e.variant.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(m) => params_to_json(m),
        }
    }
}

/// Converts a JSON document into a parameter mapping.
///
/// Returns `None` if the document is not a JSON object.
pub fn params_from_json(json: serde_json::Value) -> Option<Params> {
    match Value::from_json(json) {
        Value::Map(m) => Some(m),
        _ => None,
    }
}

/// Converts a parameter mapping into a JSON object.
pub fn params_to_json(params: &Params) -> serde_json::Value {
    serde_json::Value::Object(
        params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Enum(e) => write!(f, "{}", e.variant),
            Value::List(_) | Value::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => {
                serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
            }
            Value::Enum(e) => serializer.serialize_str(&e.variant),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_json_numbers_split_into_int_and_float() {
        assert_eq!(Value::from_json(json!(42)), Value::Int(42));
        assert_eq!(Value::from_json(json!(4.5)), Value::Float(4.5));
        assert_eq!(Value::from_json(json!(u64::MAX)), Value::Float(u64::MAX as f64));
    }

    #[test]
    fn test_params_from_json_requires_object() {
        assert!(params_from_json(json!([1, 2])).is_none());
        let params = params_from_json(json!({"a": "x", "b": {"c": true}})).unwrap();
        assert_eq!(params.get("a"), Some(&Value::from("x")));
        assert!(params.get("b").unwrap().as_map().is_some());
    }

    #[test]
    fn test_timestamp_and_enum_serialize_as_strings() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut params = Params::new();
        params.insert("start".into(), Value::Timestamp(ts));
        params.insert("kind".into(), Value::Enum(EnumValue::new("FeedbackType", "review")));

        let json = serde_json::to_value(Value::Map(params.clone())).unwrap();
        assert_eq!(json, json!({"kind": "review", "start": "2024-01-10T00:00:00"}));
        assert_eq!(params_to_json(&params), json);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::Map(Params::new()).type_name(), "map");
    }
}
