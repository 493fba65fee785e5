//! Scene graph types: shape trees, bounding boxes and visibility flags.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{NdArray, SceneValue};
use crate::error::ValidationError;

/// Placement of a node relative to its parent.
///
/// Serialized as `[[x, y, z], [qx, qy, qz, qw]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "([f64; 3], [f64; 4])", into = "([f64; 3], [f64; 4])")]
pub struct Location {
    pub position: [f64; 3],
    pub quaternion: [f64; 4],
}

impl Location {
    pub fn new(position: [f64; 3], quaternion: [f64; 4]) -> Self {
        Self {
            position,
            quaternion,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new([0.0; 3], [0.0, 0.0, 0.0, 1.0])
    }
}

impl From<([f64; 3], [f64; 4])> for Location {
    fn from((position, quaternion): ([f64; 3], [f64; 4])) -> Self {
        Self::new(position, quaternion)
    }
}

impl From<Location> for ([f64; 3], [f64; 4]) {
    fn from(loc: Location) -> Self {
        (loc.position, loc.quaternion)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
}

impl BoundingBox {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self {
            xmin: min[0],
            xmax: max[0],
            ymin: min[1],
            ymax: max[1],
            zmin: min[2],
            zmax: max[2],
        }
    }

    /// Smallest box containing all points, `None` for an empty slice
    pub fn from_points(points: &[[f64; 3]]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bb = Self::new(*first, *first);
        for p in rest {
            bb.xmin = bb.xmin.min(p[0]);
            bb.xmax = bb.xmax.max(p[0]);
            bb.ymin = bb.ymin.min(p[1]);
            bb.ymax = bb.ymax.max(p[1]);
            bb.zmin = bb.zmin.min(p[2]);
            bb.zmax = bb.zmax.max(p[2]);
        }
        Some(bb)
    }

    pub fn min(&self) -> [f64; 3] {
        [self.xmin, self.ymin, self.zmin]
    }

    pub fn max(&self) -> [f64; 3] {
        [self.xmax, self.ymax, self.zmax]
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            xmin: self.xmin.min(other.xmin),
            xmax: self.xmax.max(other.xmax),
            ymin: self.ymin.min(other.ymin),
            ymax: self.ymax.max(other.ymax),
            zmin: self.zmin.min(other.zmin),
            zmax: self.zmax.max(other.zmax),
        }
    }

    fn to_scene_value(self) -> SceneValue {
        SceneValue::map([
            ("xmin", self.xmin.into()),
            ("xmax", self.xmax.into()),
            ("ymin", self.ymin.into()),
            ("ymax", self.ymax.into()),
            ("zmin", self.zmin.into()),
            ("zmax", self.zmax.into()),
        ])
    }
}

/// A tessellated face mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// `n x 3` vertex coordinates
    pub vertices: NdArray,
    /// Flat triangle corner indices into `vertices`
    pub triangles: NdArray,
    /// `n x 3` vertex normals
    pub normals: NdArray,
    /// `m x 2 x 3` edge segments drawn on top of the faces
    pub edges: NdArray,
}

/// Geometry of a leaf node.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Faces(Mesh),
    /// `m x 2 x 3` line segments
    Edges(NdArray),
    /// `n x 3` points
    Vertices(NdArray),
}

impl Geometry {
    fn point_array(&self) -> &NdArray {
        match self {
            Geometry::Faces(mesh) => &mesh.vertices,
            Geometry::Edges(edges) => edges,
            Geometry::Vertices(points) => points,
        }
    }

    /// All coordinates of the geometry as points
    pub fn points(&self) -> Vec<[f64; 3]> {
        self.point_array()
            .to_f64_vec()
            .unwrap_or_default()
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect()
    }
}

/// A leaf node: geometry plus display hints.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub geometry: Geometry,
    /// Render back faces (faces only)
    pub renderback: Option<bool>,
    /// Line width (edges only)
    pub width: Option<f64>,
    /// Point size (vertices only)
    pub size: Option<f64>,
}

impl Leaf {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            renderback: None,
            width: None,
            size: None,
        }
    }
}

/// Either ordered children or leaf geometry, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Group(Vec<ShapeNode>),
    Leaf(Leaf),
}

/// Kind of a scene node as the viewer names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Shapes,
    Edges,
    Vertices,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Shapes => "shapes",
            NodeKind::Edges => "edges",
            NodeKind::Vertices => "vertices",
        }
    }
}

/// A node of the scene graph.
///
/// Ids are filesystem-like paths; a child's id starts with its parent's id
/// followed by `/`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeNode {
    pub id: String,
    pub name: String,
    pub loc: Option<Location>,
    pub color: Option<String>,
    pub bb: Option<BoundingBox>,
    pub content: NodeContent,
}

impl ShapeNode {
    pub fn group(
        id: impl Into<String>,
        name: impl Into<String>,
        parts: Vec<ShapeNode>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            loc: None,
            color: None,
            bb: None,
            content: NodeContent::Group(parts),
        }
    }

    pub fn leaf(id: impl Into<String>, name: impl Into<String>, leaf: Leaf) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            loc: None,
            color: None,
            bb: None,
            content: NodeContent::Leaf(leaf),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_bb(mut self, bb: BoundingBox) -> Self {
        self.bb = Some(bb);
        self
    }

    pub fn with_loc(mut self, loc: Location) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn kind(&self) -> NodeKind {
        match &self.content {
            NodeContent::Group(_) => NodeKind::Group,
            NodeContent::Leaf(leaf) => match leaf.geometry {
                Geometry::Faces(_) => NodeKind::Shapes,
                Geometry::Edges(_) => NodeKind::Edges,
                Geometry::Vertices(_) => NodeKind::Vertices,
            },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, NodeContent::Leaf(_))
    }

    /// Leaf nodes in depth-first order
    pub fn leaves(&self) -> Vec<&ShapeNode> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ShapeNode>) {
        match &self.content {
            NodeContent::Group(parts) => parts.iter().for_each(|p| p.collect_leaves(out)),
            NodeContent::Leaf(_) => out.push(self),
        }
    }

    pub fn leaf_ids(&self) -> Vec<&str> {
        self.leaves().into_iter().map(|n| n.id.as_str()).collect()
    }

    /// Ids of every node in the tree, groups included
    pub fn ids(&self) -> Vec<&str> {
        let mut out = vec![self.id.as_str()];
        if let NodeContent::Group(parts) = &self.content {
            for part in parts {
                out.extend(part.ids());
            }
        }
        out
    }

    /// Explicit bounding box, or one computed from the leaf geometry
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        if self.bb.is_some() {
            return self.bb;
        }
        match &self.content {
            NodeContent::Leaf(leaf) => BoundingBox::from_points(&leaf.geometry.points()),
            NodeContent::Group(_) => None,
        }
    }

    /// Check id uniqueness and the parent prefix rule
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        self.validate_node(&mut seen)
    }

    fn validate_node<'a>(&'a self, seen: &mut HashSet<&'a str>) -> Result<(), ValidationError> {
        if !seen.insert(self.id.as_str()) {
            return Err(ValidationError::DuplicateId(self.id.clone()));
        }
        if let NodeContent::Group(parts) = &self.content {
            let prefix = format!("{}/", self.id);
            for part in parts {
                if !part.id.starts_with(&prefix) {
                    return Err(ValidationError::NotBelowParent {
                        parent: self.id.clone(),
                        child: part.id.clone(),
                    });
                }
                part.validate_node(seen)?;
            }
        }
        Ok(())
    }

    /// Wire-shaped value tree of this node, ready for the payload encoder
    pub fn to_scene_value(&self) -> SceneValue {
        let mut map = BTreeMap::new();
        map.insert("id".to_string(), SceneValue::from(self.id.as_str()));
        map.insert("name".to_string(), SceneValue::from(self.name.as_str()));
        if let Some(loc) = self.loc {
            map.insert(
                "loc".to_string(),
                SceneValue::List(vec![
                    SceneValue::List(loc.position.iter().map(|&v| v.into()).collect()),
                    SceneValue::List(loc.quaternion.iter().map(|&v| v.into()).collect()),
                ]),
            );
        }
        if let Some(color) = &self.color {
            map.insert("color".to_string(), SceneValue::from(color.as_str()));
        }
        if let Some(bb) = self.bb {
            map.insert("bb".to_string(), bb.to_scene_value());
        }

        match &self.content {
            NodeContent::Group(parts) => {
                map.insert(
                    "parts".to_string(),
                    SceneValue::List(parts.iter().map(ShapeNode::to_scene_value).collect()),
                );
            }
            NodeContent::Leaf(leaf) => {
                map.insert("type".to_string(), self.kind().as_str().into());
                map.insert("shape".to_string(), geometry_value(&leaf.geometry));
                if let Some(renderback) = leaf.renderback {
                    map.insert("renderback".to_string(), renderback.into());
                }
                if let Some(width) = leaf.width {
                    map.insert("width".to_string(), width.into());
                }
                if let Some(size) = leaf.size {
                    map.insert("size".to_string(), size.into());
                }
            }
        }
        SceneValue::Map(map)
    }
}

fn float_array(array: &NdArray) -> SceneValue {
    array
        .to_f32()
        .map_or_else(|| SceneValue::Array(array.clone()), SceneValue::Array)
}

fn geometry_value(geometry: &Geometry) -> SceneValue {
    match geometry {
        Geometry::Faces(mesh) => SceneValue::map([
            ("vertices", float_array(&mesh.vertices)),
            ("triangles", SceneValue::Array(mesh.triangles.clone())),
            ("normals", float_array(&mesh.normals)),
            ("edges", float_array(&mesh.edges)),
        ]),
        Geometry::Edges(edges) => float_array(edges),
        Geometry::Vertices(points) => float_array(points),
    }
}

/// Visibility of an object's faces and its edges.
///
/// Serialized as `[0|1, 0|1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u8; 2]", into = "[u8; 2]")]
pub struct Visibility {
    pub object: bool,
    pub edges: bool,
}

impl Visibility {
    pub const VISIBLE: Visibility = Visibility {
        object: true,
        edges: true,
    };

    pub fn new(object: bool, edges: bool) -> Self {
        Self { object, edges }
    }
}

impl TryFrom<[u8; 2]> for Visibility {
    type Error = ValidationError;

    fn try_from(flags: [u8; 2]) -> Result<Self, Self::Error> {
        match flags {
            [o @ 0..=1, e @ 0..=1] => Ok(Self::new(o == 1, e == 1)),
            _ => Err(ValidationError::InvalidVisibilityFlag(flags)),
        }
    }
}

impl From<Visibility> for [u8; 2] {
    fn from(v: Visibility) -> Self {
        [u8::from(v.object), u8::from(v.edges)]
    }
}

/// Visibility per leaf id.
pub type VisibilityMap = BTreeMap<String, Visibility>;
