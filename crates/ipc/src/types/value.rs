//! Generic value tree handed to the scene payload encoder.

use std::collections::BTreeMap;

use serde_json::Value;

use super::NdArray;

/// A nested value that may contain numeric arrays.
///
/// This is what the scene payload encoder walks: containers are recursed
/// into, primitives pass through, and arrays are encoded for the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Raw bytes; JSON has no representation for them
    Bytes(Vec<u8>),
    Array(NdArray),
    List(Vec<SceneValue>),
    Map(BTreeMap<String, SceneValue>),
}

impl SceneValue {
    /// Build a map value from key/value pairs
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, SceneValue)>) -> Self {
        SceneValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SceneValue::Null => "null",
            SceneValue::Bool(_) => "bool",
            SceneValue::Int(_) => "int",
            SceneValue::Float(_) => "float",
            SceneValue::String(_) => "string",
            SceneValue::Bytes(_) => "bytes",
            SceneValue::Array(_) => "array",
            SceneValue::List(_) => "list",
            SceneValue::Map(_) => "map",
        }
    }
}

impl From<bool> for SceneValue {
    fn from(v: bool) -> Self {
        SceneValue::Bool(v)
    }
}

impl From<i64> for SceneValue {
    fn from(v: i64) -> Self {
        SceneValue::Int(v)
    }
}

impl From<f64> for SceneValue {
    fn from(v: f64) -> Self {
        SceneValue::Float(v)
    }
}

impl From<&str> for SceneValue {
    fn from(v: &str) -> Self {
        SceneValue::String(v.to_string())
    }
}

impl From<String> for SceneValue {
    fn from(v: String) -> Self {
        SceneValue::String(v)
    }
}

impl From<NdArray> for SceneValue {
    fn from(v: NdArray) -> Self {
        SceneValue::Array(v)
    }
}

impl From<Vec<SceneValue>> for SceneValue {
    fn from(v: Vec<SceneValue>) -> Self {
        SceneValue::List(v)
    }
}

impl<T: Into<SceneValue>> From<Option<T>> for SceneValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SceneValue::Null, Into::into)
    }
}

impl From<Value> for SceneValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => SceneValue::Null,
            Value::Bool(b) => SceneValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SceneValue::Int(i),
                None => SceneValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SceneValue::String(s),
            Value::Array(items) => SceneValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                SceneValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
