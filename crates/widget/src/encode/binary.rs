//! Arrays as out-of-band binary buffers.
//!
//! Every array is replaced by `{"shape": [n], "dtype": <name>}` and its bytes
//! are appended to the payload's buffer list. The path recorded for each
//! buffer points at the (removed) `buffer` key next to `shape` and `dtype`,
//! where the viewer reattaches it.

use cadview_ipc::{NdArray, PathElement, ScenePayload, SceneValue};
use serde_json::{Map, Value, json};

use super::{Elements, EncodeError, primitive};

/// Encode `value`, moving array data into out-of-band buffers
pub fn encode(value: &SceneValue) -> Result<ScenePayload, EncodeError> {
    let mut payload = ScenePayload::default();
    let mut path = Vec::new();
    payload.value = walk(value, &mut path, &mut payload)?;
    Ok(payload)
}

fn walk(
    value: &SceneValue,
    path: &mut Vec<PathElement>,
    payload: &mut ScenePayload,
) -> Result<Value, EncodeError> {
    match value {
        SceneValue::Array(array) => {
            let (descriptor, bytes) = encode_array(array)?;
            let mut buffer_path = path.clone();
            buffer_path.push(PathElement::from("buffer"));
            payload.buffers.push(bytes);
            payload.buffer_paths.push(buffer_path);
            Ok(descriptor)
        }
        SceneValue::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push(PathElement::Index(i));
                let encoded = walk(item, path, payload);
                path.pop();
                out.push(encoded?);
            }
            Ok(Value::Array(out))
        }
        SceneValue::Map(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                path.push(PathElement::Key(key.clone()));
                let encoded = walk(item, path, payload);
                path.pop();
                out.insert(key.clone(), encoded?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(primitive(other)?.unwrap_or_default()),
    }
}

/// Descriptor and raw bytes of one array
pub fn encode_array(array: &NdArray) -> Result<(Value, Vec<u8>), EncodeError> {
    let elements = Elements::from_array(array, true)?;
    let descriptor = json!({
        "shape": [elements.len()],
        "dtype": elements.dtype().name(),
    });
    Ok((descriptor, elements.to_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadview_ipc::{ArrayData, Layout};

    #[test]
    fn test_buffers_extracted_with_paths() {
        let tree = SceneValue::map([
            ("id", SceneValue::from("/top")),
            (
                "parts",
                SceneValue::List(vec![SceneValue::map([(
                    "shape",
                    SceneValue::map([
                        ("vertices", NdArray::from_points(&[[0.0, 1.0, 2.0]]).into()),
                        ("triangles", NdArray::from_indices(vec![0, 0, 0]).into()),
                    ]),
                )])]),
            ),
        ]);
        let payload = encode(&tree).unwrap();

        assert_eq!(payload.buffers.len(), 2);
        assert_eq!(
            payload.value["parts"][0]["shape"]["vertices"],
            json!({"shape": [3], "dtype": "float32"})
        );
        assert_eq!(
            payload.value["parts"][0]["shape"]["triangles"],
            json!({"shape": [3], "dtype": "uint32"})
        );
        // map keys are visited in sorted order
        assert_eq!(
            payload.buffer_paths[0],
            vec![
                PathElement::from("parts"),
                PathElement::Index(0),
                "shape".into(),
                "triangles".into(),
                "buffer".into()
            ]
        );
        assert_eq!(payload.buffers[0], vec![0u8; 12]);
        assert_eq!(payload.buffers[1].len(), 12);
    }

    #[test]
    fn test_float64_kept() {
        let array = NdArray::flat(ArrayData::F64(vec![0.25]));
        let (descriptor, bytes) = encode_array(&array).unwrap();
        assert_eq!(descriptor["dtype"], "float64");
        assert_eq!(bytes, 0.25f64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_column_major_flattened_row_major() {
        let array = NdArray::with_layout(
            vec![2, 2],
            ArrayData::U32(vec![1, 3, 2, 4]),
            Layout::ColumnMajor,
        )
        .unwrap();
        let (descriptor, bytes) = encode_array(&array).unwrap();
        assert_eq!(descriptor["shape"], json!([4]));
        let expected: Vec<u8> = [1u32, 2, 3, 4].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_error_leaves_no_partial_payload() {
        let tree = SceneValue::List(vec![
            NdArray::from_points(&[[0.0; 3]]).into(),
            SceneValue::Bytes(vec![0]),
        ]);
        assert!(matches!(
            encode(&tree),
            Err(EncodeError::UnsupportedValueType("bytes"))
        ));
    }
}
