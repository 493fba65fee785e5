//! The synchronized property schema.
//!
//! Every field shared between the controller and the viewer is one
//! [`Property`] variant. The serde form is `{"key": <name>, "value": <value>}`;
//! on the wire only the key/value pair inside an `update` state map is used.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use cadview_config::{Anchor, Control, Theme, UpAxis};

use crate::error::IpcError;
use crate::types::{AnimationTrack, PathElement, ScenePayload, Tab, VisibilityMap};

/// One synchronized field with its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "snake_case")]
pub enum Property {
    // Display and layout
    Title(Option<String>),
    Anchor(Option<Anchor>),
    CadWidth(u32),
    Height(u32),
    TreeWidth(u32),
    Theme(Theme),
    Pinning(bool),
    Glass(bool),

    // Scene
    Shapes(ScenePayload),
    States(VisibilityMap),
    StateUpdates(VisibilityMap),
    Tracks(Vec<AnimationTrack>),

    // Render appearance
    DefaultEdgeColor(String),
    DefaultOpacity(f64),
    AmbientIntensity(f64),
    DirectIntensity(f64),
    Metalness(f64),
    Roughness(f64),
    NormalLen(f64),

    // Viewer behavior
    Timeit(bool),
    Tools(bool),
    Ortho(bool),
    Control(Control),
    Up(UpAxis),
    Axes(bool),
    Axes0(bool),
    Grid([bool; 3]),
    Ticks(u32),
    Transparent(bool),
    BlackEdges(bool),
    Explode(bool),
    Collapse(u8),
    Tab(Tab),
    ClipIntersection(bool),
    ClipPlanes(bool),
    #[serde(rename = "clip_normal_0")]
    ClipNormal0([f64; 3]),
    #[serde(rename = "clip_normal_1")]
    ClipNormal1([f64; 3]),
    #[serde(rename = "clip_normal_2")]
    ClipNormal2([f64; 3]),
    #[serde(rename = "clip_slider_0")]
    ClipSlider0(f64),
    #[serde(rename = "clip_slider_1")]
    ClipSlider1(f64),
    #[serde(rename = "clip_slider_2")]
    ClipSlider2(f64),
    ClipObjectColors(bool),

    // Camera
    ResetCamera(bool),
    Position(Option<[f64; 3]>),
    Quaternion(Option<[f64; 4]>),
    Target(Option<[f64; 3]>),
    Zoom(Option<f64>),
    Position0(Option<[f64; 3]>),
    Quaternion0(Option<[f64; 4]>),
    Target0(Option<[f64; 3]>),
    Zoom0(Option<f64>),

    // Interaction speeds
    ZoomSpeed(f64),
    PanSpeed(f64),
    RotateSpeed(f64),
    AnimationSpeed(f64),

    // Reported by the viewer
    #[serde(rename = "lastPick")]
    LastPick(Option<Map<String, Value>>),
    Result(Option<String>),
    Disposed(bool),
    ActiveTool(Option<String>),
    Selected(Vec<String>),
    Measurement(Option<Value>),

    // Internal
    Initialize(bool),
    JsDebug(bool),
    ImageId(Option<String>),
}

/// A property split into its wire parts.
#[derive(Debug, Clone, PartialEq)]
pub struct WireField {
    pub key: &'static str,
    pub value: Value,
    pub buffers: Vec<Vec<u8>>,
    /// Paths of `buffers` relative to the state map, starting with `key`
    pub buffer_paths: Vec<Vec<PathElement>>,
}

impl Property {
    /// Wire name of the field
    pub fn key(&self) -> &'static str {
        match self {
            Property::Title(_) => "title",
            Property::Anchor(_) => "anchor",
            Property::CadWidth(_) => "cad_width",
            Property::Height(_) => "height",
            Property::TreeWidth(_) => "tree_width",
            Property::Theme(_) => "theme",
            Property::Pinning(_) => "pinning",
            Property::Glass(_) => "glass",
            Property::Shapes(_) => "shapes",
            Property::States(_) => "states",
            Property::StateUpdates(_) => "state_updates",
            Property::Tracks(_) => "tracks",
            Property::DefaultEdgeColor(_) => "default_edge_color",
            Property::DefaultOpacity(_) => "default_opacity",
            Property::AmbientIntensity(_) => "ambient_intensity",
            Property::DirectIntensity(_) => "direct_intensity",
            Property::Metalness(_) => "metalness",
            Property::Roughness(_) => "roughness",
            Property::NormalLen(_) => "normal_len",
            Property::Timeit(_) => "timeit",
            Property::Tools(_) => "tools",
            Property::Ortho(_) => "ortho",
            Property::Control(_) => "control",
            Property::Up(_) => "up",
            Property::Axes(_) => "axes",
            Property::Axes0(_) => "axes0",
            Property::Grid(_) => "grid",
            Property::Ticks(_) => "ticks",
            Property::Transparent(_) => "transparent",
            Property::BlackEdges(_) => "black_edges",
            Property::Explode(_) => "explode",
            Property::Collapse(_) => "collapse",
            Property::Tab(_) => "tab",
            Property::ClipIntersection(_) => "clip_intersection",
            Property::ClipPlanes(_) => "clip_planes",
            Property::ClipNormal0(_) => "clip_normal_0",
            Property::ClipNormal1(_) => "clip_normal_1",
            Property::ClipNormal2(_) => "clip_normal_2",
            Property::ClipSlider0(_) => "clip_slider_0",
            Property::ClipSlider1(_) => "clip_slider_1",
            Property::ClipSlider2(_) => "clip_slider_2",
            Property::ClipObjectColors(_) => "clip_object_colors",
            Property::ResetCamera(_) => "reset_camera",
            Property::Position(_) => "position",
            Property::Quaternion(_) => "quaternion",
            Property::Target(_) => "target",
            Property::Zoom(_) => "zoom",
            Property::Position0(_) => "position0",
            Property::Quaternion0(_) => "quaternion0",
            Property::Target0(_) => "target0",
            Property::Zoom0(_) => "zoom0",
            Property::ZoomSpeed(_) => "zoom_speed",
            Property::PanSpeed(_) => "pan_speed",
            Property::RotateSpeed(_) => "rotate_speed",
            Property::AnimationSpeed(_) => "animation_speed",
            Property::LastPick(_) => "lastPick",
            Property::Result(_) => "result",
            Property::Disposed(_) => "disposed",
            Property::ActiveTool(_) => "active_tool",
            Property::Selected(_) => "selected",
            Property::Measurement(_) => "measurement",
            Property::Initialize(_) => "initialize",
            Property::JsDebug(_) => "js_debug",
            Property::ImageId(_) => "image_id",
        }
    }

    /// Fields only the viewer writes
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Property::LastPick(_)
                | Property::Result(_)
                | Property::Disposed(_)
                | Property::ActiveTool(_)
                | Property::Selected(_)
                | Property::Measurement(_)
        )
    }

    pub fn is_writable(&self) -> bool {
        !self.is_read_only()
    }

    /// Split into key, JSON value and out-of-band buffers
    pub fn into_wire(self) -> Result<WireField, IpcError> {
        let key = self.key();
        if let Property::Shapes(payload) = self {
            let buffer_paths = payload
                .buffer_paths
                .into_iter()
                .map(|path| {
                    let mut full = Vec::with_capacity(path.len() + 1);
                    full.push(PathElement::from(key));
                    full.extend(path);
                    full
                })
                .collect();
            return Ok(WireField {
                key,
                value: payload.value,
                buffers: payload.buffers,
                buffer_paths,
            });
        }

        let value = match serde_json::to_value(&self)? {
            Value::Object(mut map) => map.remove("value").unwrap_or(Value::Null),
            other => {
                return Err(IpcError::InvalidFormat(format!(
                    "property {key} serialized to {other}"
                )));
            }
        };
        Ok(WireField {
            key,
            value,
            buffers: Vec::new(),
            buffer_paths: Vec::new(),
        })
    }

    /// Decode one entry of an inbound state map
    pub fn from_wire(key: &str, value: Value) -> Result<Self, IpcError> {
        Ok(serde_json::from_value(json!({ "key": key, "value": value }))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Visibility;

    #[test]
    fn test_key_matches_serde_name() {
        let samples = [
            Property::ClipNormal1([0.0, 1.0, 0.0]),
            Property::LastPick(None),
            Property::Axes0(true),
            Property::Position0(Some([1.0, 2.0, 3.0])),
            Property::StateUpdates(VisibilityMap::new()),
            Property::Control(Control::Orbit),
        ];
        for property in samples {
            let json = serde_json::to_value(&property).unwrap();
            assert_eq!(json["key"], property.key());
        }
    }

    #[test]
    fn test_into_wire_plain_value() {
        let field = Property::Zoom(Some(2.5)).into_wire().unwrap();
        assert_eq!(field.key, "zoom");
        assert_eq!(field.value, json!(2.5));
        assert!(field.buffers.is_empty());

        let field = Property::Quaternion(None).into_wire().unwrap();
        assert_eq!(field.value, Value::Null);
    }

    #[test]
    fn test_into_wire_prefixes_buffer_paths() {
        let payload = ScenePayload {
            value: json!({"shape": {"vertices": {"shape": [3], "dtype": "float32"}}}),
            buffers: vec![vec![0; 12]],
            buffer_paths: vec![vec!["shape".into(), "vertices".into(), "buffer".into()]],
        };
        let field = Property::Shapes(payload).into_wire().unwrap();
        assert_eq!(
            field.buffer_paths,
            vec![vec![
                PathElement::from("shapes"),
                "shape".into(),
                "vertices".into(),
                "buffer".into()
            ]]
        );
        assert_eq!(field.buffers.len(), 1);
    }

    #[test]
    fn test_from_wire() {
        let states = Property::from_wire("states", json!({"/a": [1, 0]})).unwrap();
        let mut expected = VisibilityMap::new();
        expected.insert("/a".into(), Visibility::new(true, false));
        assert_eq!(states, Property::States(expected));

        let pick = Property::from_wire("lastPick", json!({"path": "/top"})).unwrap();
        assert!(pick.is_read_only());

        assert!(Property::from_wire("no_such_key", json!(1)).is_err());
        assert!(Property::from_wire("zoom", json!("far")).is_err());
    }
}
