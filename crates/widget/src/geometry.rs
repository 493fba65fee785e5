//! Bounding box helpers used for camera placement.

use cadview_ipc::{BoundingBox, ShapeNode};
use glam::DVec3;

/// A combined bounding box with its derived measures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedBox {
    pub bbox: BoundingBox,
    /// Edge lengths along x, y and z
    pub size: DVec3,
    pub center: DVec3,
    /// Largest absolute coordinate of the box
    pub max: f64,
}

impl CombinedBox {
    pub fn new(bbox: BoundingBox) -> Self {
        let min = DVec3::from_array(bbox.min());
        let max = DVec3::from_array(bbox.max());
        let size = max - min;
        Self {
            bbox,
            size,
            center: min + size / 2.0,
            max: min.abs().max(max.abs()).max_element(),
        }
    }

    pub fn max_distance_from_center(&self) -> f64 {
        max_distance_from_center(&self.bbox)
    }

    pub fn max_distance_from_origin(&self) -> f64 {
        max_distance_from_origin(&self.bbox)
    }
}

/// Union of the bounding boxes of all leaves of `tree`.
///
/// Leaves without an explicit box use one computed from their geometry.
/// Returns `None` when no leaf has a box.
pub fn combine(tree: &ShapeNode) -> Option<CombinedBox> {
    combine_boxes(tree.leaves().into_iter().filter_map(ShapeNode::bounding_box))
}

/// Union of arbitrary boxes, `None` for an empty iterator
pub fn combine_boxes(boxes: impl IntoIterator<Item = BoundingBox>) -> Option<CombinedBox> {
    boxes
        .into_iter()
        .reduce(|acc, bb| acc.union(&bb))
        .map(CombinedBox::new)
}

/// The eight corners of a box
pub fn corners(bb: &BoundingBox) -> [DVec3; 8] {
    let mut out = [DVec3::ZERO; 8];
    let mut i = 0;
    for x in [bb.xmin, bb.xmax] {
        for y in [bb.ymin, bb.ymax] {
            for z in [bb.zmin, bb.zmax] {
                out[i] = DVec3::new(x, y, z);
                i += 1;
            }
        }
    }
    out
}

fn center(bb: &BoundingBox) -> DVec3 {
    (DVec3::from_array(bb.min()) + DVec3::from_array(bb.max())) / 2.0
}

pub fn max_distance_from_center(bb: &BoundingBox) -> f64 {
    let c = center(bb);
    corners(bb)
        .iter()
        .map(|corner| corner.distance(c))
        .fold(0.0, f64::max)
}

pub fn max_distance_from_origin(bb: &BoundingBox) -> f64 {
    corners(bb).iter().map(|corner| corner.length()).fold(0.0, f64::max)
}

/// Center and radius of the sphere through the box corners
pub fn bounding_sphere(bb: &BoundingBox) -> (DVec3, f64) {
    (center(bb), max_distance_from_center(bb))
}

/// Unit vector in the direction of `v`, `None` for zero or non-finite input
pub fn normalize(v: DVec3) -> Option<DVec3> {
    v.try_normalize()
}
