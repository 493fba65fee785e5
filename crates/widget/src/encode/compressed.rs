//! Inline compressed array blocks.
//!
//! A block is `[tag, shape, data]` where `tag` is `"_f32"` or `"_i32"` and
//! `data` is the base64 text of the zlib-compressed little-endian elements.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cadview_ipc::{ArrayData, NdArray, SceneValue};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde_json::{Map, Value, json};

use super::{Elements, EncodeError, primitive};

const FLOAT_TAG: &str = "_f32";
const INDEX_TAG: &str = "_i32";

/// Replace every array in `value` by a compressed block
pub fn encode(value: &SceneValue) -> Result<Value, EncodeError> {
    match value {
        SceneValue::Array(array) => encode_array(array),
        SceneValue::List(items) => items
            .iter()
            .map(encode)
            .collect::<Result<_, _>>()
            .map(Value::Array),
        SceneValue::Map(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                out.insert(key.clone(), encode(item)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(primitive(other)?.unwrap_or_default()),
    }
}

/// Compressed block for a single array
pub fn encode_array(array: &NdArray) -> Result<Value, EncodeError> {
    let elements = Elements::from_array(array, false)?;
    let tag = match elements {
        Elements::U32(_) => INDEX_TAG,
        _ => FLOAT_TAG,
    };

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&elements.to_bytes())?;
    let compressed = encoder.finish()?;

    Ok(json!([tag, array.shape(), STANDARD.encode(compressed)]))
}

/// Decode a compressed block back into an array
pub fn decode_array(block: &Value) -> Result<NdArray, EncodeError> {
    let malformed = |reason: &str| EncodeError::MalformedBlock(reason.to_string());

    let parts = block
        .as_array()
        .filter(|parts| parts.len() == 3)
        .ok_or_else(|| malformed("expected [tag, shape, data]"))?;
    let tag = parts[0].as_str().ok_or_else(|| malformed("tag is not a string"))?;
    let shape = parts[1]
        .as_array()
        .and_then(|dims| {
            dims.iter()
                .map(|d| d.as_u64().and_then(|d| usize::try_from(d).ok()))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| malformed("shape is not a list of sizes"))?;
    let text = parts[2].as_str().ok_or_else(|| malformed("data is not a string"))?;

    let compressed = STANDARD
        .decode(text)
        .map_err(|e| EncodeError::MalformedBlock(e.to_string()))?;
    let mut bytes = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut bytes)
        .map_err(|e| EncodeError::MalformedBlock(e.to_string()))?;
    if bytes.len() % 4 != 0 {
        return Err(malformed("data length is not a multiple of 4"));
    }

    let data = match tag {
        FLOAT_TAG => ArrayData::F32(
            bytes
                .chunks_exact(4)
                .map(|chunk| f32::from_bits(read_le_u32(chunk)))
                .collect(),
        ),
        INDEX_TAG => ArrayData::U32(
            bytes
                .chunks_exact(4)
                .map(read_le_u32)
                .collect(),
        ),
        other => return Err(EncodeError::MalformedBlock(format!("unknown tag {other}"))),
    };

    let len = data.len();
    NdArray::new(shape.clone(), data).map_err(|_| EncodeError::ShapeMismatch { shape, len })
}

fn read_le_u32(chunk: &[u8]) -> u32 {
    u32::from_le(bytemuck::pod_read_unaligned(chunk))
}

fn is_block(items: &[Value]) -> bool {
    items.len() == 3
        && matches!(items[0].as_str(), Some(FLOAT_TAG | INDEX_TAG))
        && items[1].is_array()
        && items[2].is_string()
}

/// Decode a whole compressed payload back into a value tree
pub fn decode_value(value: &Value) -> Result<SceneValue, EncodeError> {
    Ok(match value {
        Value::Array(items) if is_block(items) => SceneValue::Array(decode_array(value)?),
        Value::Array(items) => {
            SceneValue::List(items.iter().map(decode_value).collect::<Result<_, _>>()?)
        }
        Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (key, item) in map {
                out.insert(key.clone(), decode_value(item)?);
            }
            SceneValue::Map(out)
        }
        other => SceneValue::from(other.clone()),
    })
}
