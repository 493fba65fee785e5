//! Sweeps over generated inputs for the path parser, the payload encoders
//! and the bounding box helpers.

use approx::assert_relative_eq;
use cadview_config::PayloadEncoding;
use cadview_ipc::{ArrayData, BoundingBox, NdArray, SceneValue};
use cadview_widget::encode::{binary, compressed};
use cadview_widget::geometry::{self, combine_boxes};
use cadview_widget::{CAMERA_DISTANCE_FACTOR, ObjectPath, default_position, encode};

/// Small deterministic generator so sweeps are reproducible
struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    fn next_f64(&mut self, scale: f64) -> f64 {
        (self.next_u32() as f64 / u32::MAX as f64 - 0.5) * 2.0 * scale
    }
}

fn random_box(rng: &mut Lcg) -> BoundingBox {
    let a = [rng.next_f64(50.0), rng.next_f64(50.0), rng.next_f64(50.0)];
    let b = [rng.next_f64(50.0), rng.next_f64(50.0), rng.next_f64(50.0)];
    BoundingBox::new(
        [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
        [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
    )
}

#[test]
fn test_path_display_reparses_to_same_path() {
    let inputs = [
        "viewer",
        "viewer.update",
        "viewer.controls.rotateX",
        "viewer.clipping.sliders[1].setValue",
        "grid[0,1,2].visible",
        "a[1][2].b",
        "_private.$el",
        "x1.y2[10].z3[0]",
    ];
    for input in inputs {
        let path = ObjectPath::parse(input).unwrap();
        let canonical = path.to_string();
        let reparsed = ObjectPath::parse(&canonical).unwrap();
        assert_eq!(reparsed, path, "{input} -> {canonical}");
        assert_eq!(reparsed.to_string(), canonical);
    }
}

#[test]
fn test_compressed_float_blocks_round_trip() {
    let mut rng = Lcg(7);
    for n in 1..40 {
        let data: Vec<f32> = (0..n * 3).map(|_| rng.next_f64(1e3) as f32).collect();
        let array = NdArray::new(vec![n, 3], ArrayData::F32(data)).unwrap();
        let block = compressed::encode_array(&array).unwrap();
        assert_eq!(compressed::decode_array(&block).unwrap(), array);
    }
}

#[test]
fn test_compressed_index_blocks_round_trip() {
    let mut rng = Lcg(11);
    for n in 1..40 {
        let indices: Vec<u32> = (0..n * 3).map(|_| rng.next_u32()).collect();
        let array = NdArray::from_indices(indices);
        let block = compressed::encode_array(&array).unwrap();
        assert_eq!(compressed::decode_array(&block).unwrap(), array);
    }
}

#[test]
fn test_binary_buffers_hold_little_endian_values() {
    let mut rng = Lcg(13);
    for n in 1..20 {
        let data: Vec<f32> = (0..n).map(|_| rng.next_f64(10.0) as f32).collect();
        let array = NdArray::new(vec![n], ArrayData::F32(data.clone())).unwrap();
        let (descriptor, bytes) = binary::encode_array(&array).unwrap();

        assert_eq!(descriptor["dtype"], "float32");
        assert_eq!(descriptor["shape"][0], n);
        let expected: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(bytes, expected);
    }
}

#[test]
fn test_encodings_agree_on_structure() {
    let value = SceneValue::map([
        ("id", "/top".into()),
        (
            "parts",
            SceneValue::List(vec![SceneValue::Array(NdArray::from_points(&[
                [0.0, 1.0, 2.0],
                [3.0, 4.0, 5.0],
            ]))]),
        ),
    ]);

    let inline = encode(&value, PayloadEncoding::Compressed).unwrap();
    let split = encode(&value, PayloadEncoding::Binary).unwrap();
    assert!(inline.buffers.is_empty());
    assert_eq!(split.buffers.len(), 1);
    assert_eq!(inline.value["id"], split.value["id"]);
    assert_eq!(
        compressed::decode_value(&inline.value).unwrap(),
        value,
        "compressed payload decodes back to the input"
    );
}

#[test]
fn test_combined_box_matches_brute_force() {
    let mut rng = Lcg(3);
    for count in 1..25 {
        let boxes: Vec<BoundingBox> = (0..count).map(|_| random_box(&mut rng)).collect();
        let combined = combine_boxes(boxes.iter().copied()).unwrap();

        let min = |axis: usize| {
            boxes
                .iter()
                .map(|b| b.min()[axis])
                .fold(f64::INFINITY, f64::min)
        };
        let max = |axis: usize| {
            boxes
                .iter()
                .map(|b| b.max()[axis])
                .fold(f64::NEG_INFINITY, f64::max)
        };
        for axis in 0..3 {
            assert_eq!(combined.bbox.min()[axis], min(axis));
            assert_eq!(combined.bbox.max()[axis], max(axis));
            assert_relative_eq!(
                combined.center.to_array()[axis],
                (min(axis) + max(axis)) / 2.0,
                max_relative = 1e-12
            );
        }
        for b in &boxes {
            assert!(geometry::max_distance_from_center(b) <= combined.max_distance_from_center() + 1e-9);
        }
    }
}

#[test]
fn test_default_position_distance() {
    let mut rng = Lcg(5);
    for _ in 0..25 {
        let combined = combine_boxes([random_box(&mut rng)]).unwrap();
        let position = glam::DVec3::from_array(default_position(&combined));
        assert_relative_eq!(
            position.distance(combined.center),
            CAMERA_DISTANCE_FACTOR * combined.max_distance_from_center(),
            max_relative = 1e-9
        );
    }
}
