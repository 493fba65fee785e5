//! Encoded scene payloads and JSON paths into them.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One step of a JSON path or a viewer navigation route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Key(key) => f.write_str(key),
            PathElement::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

/// Encoded scene tree.
///
/// `buffers[i]` belongs at `buffer_paths[i]` inside `value`. Only `value` is
/// part of the JSON form; buffers travel next to the message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenePayload {
    pub value: Value,
    pub buffers: Vec<Vec<u8>>,
    pub buffer_paths: Vec<Vec<PathElement>>,
}

impl ScenePayload {
    /// A payload without out-of-band buffers
    pub fn inline(value: Value) -> Self {
        Self {
            value,
            buffers: Vec::new(),
            buffer_paths: Vec::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Total size of the out-of-band buffers in bytes
    pub fn buffer_bytes(&self) -> usize {
        self.buffers.iter().map(Vec::len).sum()
    }
}

impl Serialize for ScenePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScenePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ScenePayload::inline)
    }
}
