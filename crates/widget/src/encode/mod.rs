//! Scene payload encoding.
//!
//! Walks a [`SceneValue`] tree and replaces every numeric array with its
//! wire form. Two strategies exist:
//!
//! - [`PayloadEncoding::Compressed`]: arrays become
//!   `["_f32" | "_i32", shape, base64(zlib(bytes))]` inline in the JSON.
//! - [`PayloadEncoding::Binary`]: arrays become `{"shape": [n], "dtype": ..}`
//!   and their bytes travel as out-of-band buffers.
//!
//! Integer arrays are triangle and edge indices for the viewer and are always
//! sent as `u32`.

pub mod binary;
pub mod compressed;

use cadview_config::PayloadEncoding;
use cadview_ipc::{ArrayData, DType, NdArray, ScenePayload, SceneValue};
use serde_json::{Number, Value};

/// Errors raised while encoding or decoding a scene payload.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Arrays of element type {0} cannot be sent to the viewer")]
    UnsupportedArrayType(DType),

    #[error("Values of type {0} cannot be sent to the viewer")]
    UnsupportedValueType(&'static str),

    #[error("Index {0} does not fit into an unsigned 32-bit integer")]
    IndexOutOfRange(i128),

    #[error("Malformed compressed block: {0}")]
    MalformedBlock(String),

    #[error("Array shape {shape:?} does not match {len} decoded elements")]
    ShapeMismatch { shape: Vec<usize>, len: usize },

    #[error("Compression failed: {0}")]
    Zlib(#[from] std::io::Error),
}

/// Encode a scene tree with the given strategy
pub fn encode(value: &SceneValue, encoding: PayloadEncoding) -> Result<ScenePayload, EncodeError> {
    match encoding {
        PayloadEncoding::Compressed => compressed::encode(value).map(ScenePayload::inline),
        PayloadEncoding::Binary => binary::encode(value),
    }
}

/// Element data ready to be turned into bytes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Elements {
    F32(Vec<f32>),
    F64(Vec<f64>),
    U32(Vec<u32>),
}

impl Elements {
    /// Row-major element data of `array`. Floats are narrowed to `f32`
    /// unless `keep_f64` is set; integers are normalized to `u32`.
    pub(crate) fn from_array(array: &NdArray, keep_f64: bool) -> Result<Self, EncodeError> {
        let array = array.to_row_major();
        Ok(match array.data() {
            ArrayData::F32(v) => Elements::F32(v.clone()),
            ArrayData::F64(v) if keep_f64 => Elements::F64(v.clone()),
            ArrayData::F64(v) => Elements::F32(v.iter().map(|&x| x as f32).collect()),
            ArrayData::I32(v) => Elements::U32(to_u32(v)?),
            ArrayData::I64(v) => Elements::U32(to_u32(v)?),
            ArrayData::U32(v) => Elements::U32(v.clone()),
            ArrayData::U64(v) => Elements::U32(to_u32(v)?),
            ArrayData::Bool(_) | ArrayData::Str(_) => {
                return Err(EncodeError::UnsupportedArrayType(array.dtype()));
            }
        })
    }

    pub(crate) fn dtype(&self) -> DType {
        match self {
            Elements::F32(_) => DType::Float32,
            Elements::F64(_) => DType::Float64,
            Elements::U32(_) => DType::UInt32,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Elements::F32(v) => v.len(),
            Elements::F64(v) => v.len(),
            Elements::U32(v) => v.len(),
        }
    }

    /// Raw little-endian element bytes, independent of the host byte order
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        match self {
            Elements::F32(v) => {
                let words: Vec<u32> = v.iter().map(|x| x.to_bits().to_le()).collect();
                bytemuck::cast_slice(&words).to_vec()
            }
            Elements::F64(v) => {
                let words: Vec<u64> = v.iter().map(|x| x.to_bits().to_le()).collect();
                bytemuck::cast_slice(&words).to_vec()
            }
            Elements::U32(v) => {
                let words: Vec<u32> = v.iter().map(|x| x.to_le()).collect();
                bytemuck::cast_slice(&words).to_vec()
            }
        }
    }
}

fn to_u32<T>(values: &[T]) -> Result<Vec<u32>, EncodeError>
where
    T: Copy + Into<i128>,
{
    values
        .iter()
        .map(|&v| {
            let wide: i128 = v.into();
            u32::try_from(wide).map_err(|_| EncodeError::IndexOutOfRange(wide))
        })
        .collect()
}

/// JSON form of a primitive, `None` for containers and arrays
pub(crate) fn primitive(value: &SceneValue) -> Result<Option<Value>, EncodeError> {
    Ok(Some(match value {
        SceneValue::Null => Value::Null,
        SceneValue::Bool(b) => Value::Bool(*b),
        SceneValue::Int(i) => Value::from(*i),
        SceneValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or(EncodeError::UnsupportedValueType("non-finite float"))?,
        SceneValue::String(s) => Value::String(s.clone()),
        SceneValue::Bytes(_) => return Err(EncodeError::UnsupportedValueType("bytes")),
        SceneValue::Array(_) | SceneValue::List(_) | SceneValue::Map(_) => return Ok(None),
    }))
}
