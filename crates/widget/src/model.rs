//! Synchronized widget state and batched change notification.

use std::fmt::Write as _;

use cadview_comm::Comm;
use cadview_config::{
    Anchor, Control, DEFAULT_AMBIENT_INTENSITY, DEFAULT_DIRECT_INTENSITY, DEFAULT_EDGE_COLOR,
    DEFAULT_METALNESS, DEFAULT_OPACITY, DEFAULT_ROUGHNESS, DEFAULT_TICKS, DisplayConfig, Theme,
    UpAxis,
};
use cadview_ipc::{
    AnimationTrack, ControllerToViewer, LastPick, Property, ScenePayload, Tab, ValidationError,
    VisibilityMap,
};
use serde_json::{Map, Value};

use crate::error::WidgetError;

/// Local mirror of every synchronized field.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetState {
    pub title: Option<String>,
    pub anchor: Option<Anchor>,
    pub cad_width: u32,
    pub height: u32,
    pub tree_width: u32,
    pub theme: Theme,
    pub pinning: bool,
    pub glass: bool,

    pub shapes: ScenePayload,
    pub states: VisibilityMap,
    pub state_updates: VisibilityMap,
    pub tracks: Vec<AnimationTrack>,

    pub default_edge_color: String,
    pub default_opacity: f64,
    pub ambient_intensity: f64,
    pub direct_intensity: f64,
    pub metalness: f64,
    pub roughness: f64,
    pub normal_len: f64,

    pub timeit: bool,
    pub tools: bool,
    pub ortho: bool,
    /// `None` until the first scene was shown
    pub control: Option<Control>,
    pub up: UpAxis,
    pub axes: bool,
    pub axes0: bool,
    pub grid: [bool; 3],
    pub ticks: u32,
    pub transparent: bool,
    pub black_edges: bool,
    pub explode: bool,
    pub collapse: u8,
    pub tab: Tab,
    pub clip_intersection: bool,
    pub clip_planes: bool,
    pub clip_normals: [[f64; 3]; 3],
    pub clip_sliders: [f64; 3],
    pub clip_object_colors: bool,

    pub reset_camera: bool,
    pub position: Option<[f64; 3]>,
    pub quaternion: Option<[f64; 4]>,
    pub target: Option<[f64; 3]>,
    pub zoom: Option<f64>,
    pub position0: Option<[f64; 3]>,
    pub quaternion0: Option<[f64; 4]>,
    pub target0: Option<[f64; 3]>,
    pub zoom0: Option<f64>,

    pub zoom_speed: f64,
    pub pan_speed: f64,
    pub rotate_speed: f64,
    pub animation_speed: f64,

    pub last_pick: Option<LastPick>,
    pub result: Option<String>,
    pub disposed: bool,
    pub active_tool: Option<String>,
    pub selected: Vec<String>,
    pub measurement: Option<Value>,

    pub initialize: bool,
    pub js_debug: bool,
    pub image_id: Option<String>,
}

impl WidgetState {
    /// Initial state of a viewer with the given display configuration
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            title: config.title.clone(),
            anchor: config.anchor,
            cad_width: config.cad_width,
            height: config.height,
            tree_width: config.tree_width,
            theme: config.theme,
            pinning: config.pinning,
            glass: config.glass,

            shapes: ScenePayload::default(),
            states: VisibilityMap::new(),
            state_updates: VisibilityMap::new(),
            tracks: Vec::new(),

            default_edge_color: DEFAULT_EDGE_COLOR.to_string(),
            default_opacity: DEFAULT_OPACITY,
            ambient_intensity: DEFAULT_AMBIENT_INTENSITY,
            direct_intensity: DEFAULT_DIRECT_INTENSITY,
            metalness: DEFAULT_METALNESS,
            roughness: DEFAULT_ROUGHNESS,
            normal_len: 0.0,

            timeit: false,
            tools: true,
            ortho: true,
            control: None,
            up: UpAxis::default(),
            axes: false,
            axes0: false,
            grid: [false; 3],
            ticks: DEFAULT_TICKS,
            transparent: false,
            black_edges: false,
            explode: false,
            collapse: 1,
            tab: Tab::default(),
            clip_intersection: false,
            clip_planes: false,
            clip_normals: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]],
            clip_sliders: [0.0; 3],
            clip_object_colors: false,

            reset_camera: true,
            position: None,
            quaternion: None,
            target: None,
            zoom: None,
            position0: None,
            quaternion0: None,
            target0: None,
            zoom0: None,

            zoom_speed: 1.0,
            pan_speed: 1.0,
            rotate_speed: 1.0,
            animation_speed: 1.0,

            last_pick: None,
            result: None,
            disposed: false,
            active_tool: None,
            selected: Vec::new(),
            measurement: None,

            initialize: false,
            js_debug: false,
            image_id: None,
        }
    }

    /// Store a property value in the mirror
    pub fn apply(&mut self, property: Property) {
        match property {
            Property::Title(v) => self.title = v,
            Property::Anchor(v) => self.anchor = v,
            Property::CadWidth(v) => self.cad_width = v,
            Property::Height(v) => self.height = v,
            Property::TreeWidth(v) => self.tree_width = v,
            Property::Theme(v) => self.theme = v,
            Property::Pinning(v) => self.pinning = v,
            Property::Glass(v) => self.glass = v,

            Property::Shapes(v) => self.shapes = v,
            Property::States(v) => self.states = v,
            Property::StateUpdates(v) => {
                // patches are merged into the full map as well
                self.states.extend(v.iter().map(|(k, s)| (k.clone(), *s)));
                self.state_updates = v;
            }
            Property::Tracks(v) => self.tracks = v,

            Property::DefaultEdgeColor(v) => self.default_edge_color = v,
            Property::DefaultOpacity(v) => self.default_opacity = v,
            Property::AmbientIntensity(v) => self.ambient_intensity = v,
            Property::DirectIntensity(v) => self.direct_intensity = v,
            Property::Metalness(v) => self.metalness = v,
            Property::Roughness(v) => self.roughness = v,
            Property::NormalLen(v) => self.normal_len = v,

            Property::Timeit(v) => self.timeit = v,
            Property::Tools(v) => self.tools = v,
            Property::Ortho(v) => self.ortho = v,
            Property::Control(v) => self.control = Some(v),
            Property::Up(v) => self.up = v,
            Property::Axes(v) => self.axes = v,
            Property::Axes0(v) => self.axes0 = v,
            Property::Grid(v) => self.grid = v,
            Property::Ticks(v) => self.ticks = v,
            Property::Transparent(v) => self.transparent = v,
            Property::BlackEdges(v) => self.black_edges = v,
            Property::Explode(v) => self.explode = v,
            Property::Collapse(v) => self.collapse = v,
            Property::Tab(v) => self.tab = v,
            Property::ClipIntersection(v) => self.clip_intersection = v,
            Property::ClipPlanes(v) => self.clip_planes = v,
            Property::ClipNormal0(v) => self.clip_normals[0] = v,
            Property::ClipNormal1(v) => self.clip_normals[1] = v,
            Property::ClipNormal2(v) => self.clip_normals[2] = v,
            Property::ClipSlider0(v) => self.clip_sliders[0] = v,
            Property::ClipSlider1(v) => self.clip_sliders[1] = v,
            Property::ClipSlider2(v) => self.clip_sliders[2] = v,
            Property::ClipObjectColors(v) => self.clip_object_colors = v,

            Property::ResetCamera(v) => self.reset_camera = v,
            Property::Position(v) => self.position = v,
            Property::Quaternion(v) => self.quaternion = v,
            Property::Target(v) => self.target = v,
            Property::Zoom(v) => self.zoom = v,
            Property::Position0(v) => self.position0 = v,
            Property::Quaternion0(v) => self.quaternion0 = v,
            Property::Target0(v) => self.target0 = v,
            Property::Zoom0(v) => self.zoom0 = v,

            Property::ZoomSpeed(v) => self.zoom_speed = v,
            Property::PanSpeed(v) => self.pan_speed = v,
            Property::RotateSpeed(v) => self.rotate_speed = v,
            Property::AnimationSpeed(v) => self.animation_speed = v,

            Property::LastPick(v) => self.last_pick = v,
            Property::Result(v) => self.result = v,
            Property::Disposed(v) => self.disposed = v,
            Property::ActiveTool(v) => self.active_tool = v,
            Property::Selected(v) => self.selected = v,
            Property::Measurement(v) => self.measurement = v,

            Property::Initialize(v) => self.initialize = v,
            Property::JsDebug(v) => self.js_debug = v,
            Property::ImageId(v) => self.image_id = v,
        }
    }

    /// Human readable listing of the model, grouped like the viewer's options
    pub fn summary(&self, include_shapes: bool) -> String {
        fn opt<T: std::fmt::Debug>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "None".to_string(), |v| format!("{v:?}"))
        }

        let mut out = String::new();
        let shapes = if include_shapes {
            self.shapes.value.to_string()
        } else {
            format!(
                "... ({} buffers, {} bytes)",
                self.shapes.buffers.len(),
                self.shapes.buffer_bytes()
            )
        };
        let control = self
            .control
            .map_or_else(|| "None".to_string(), |c| c.to_string());

        let sections: [(&str, Vec<(&str, String)>); 5] = [
            (
                "DISPLAY",
                vec![
                    ("title", opt(&self.title)),
                    ("anchor", opt(&self.anchor)),
                    ("cad_width", self.cad_width.to_string()),
                    ("height", self.height.to_string()),
                    ("tree_width", self.tree_width.to_string()),
                    ("theme", format!("{:?}", self.theme)),
                    ("pinning", self.pinning.to_string()),
                    ("glass", self.glass.to_string()),
                ],
            ),
            (
                "SHAPES",
                vec![
                    ("shapes", shapes),
                    ("states", format!("{:?}", self.states)),
                    ("tracks", self.tracks.len().to_string()),
                ],
            ),
            (
                "RENDERER",
                vec![
                    ("normal_len", self.normal_len.to_string()),
                    ("default_edge_color", self.default_edge_color.clone()),
                    ("default_opacity", self.default_opacity.to_string()),
                    ("ambient_intensity", self.ambient_intensity.to_string()),
                    ("direct_intensity", self.direct_intensity.to_string()),
                    ("metalness", self.metalness.to_string()),
                    ("roughness", self.roughness.to_string()),
                ],
            ),
            (
                "VIEWER",
                vec![
                    ("timeit", self.timeit.to_string()),
                    ("tools", self.tools.to_string()),
                    ("ortho", self.ortho.to_string()),
                    ("control", control),
                    ("up", format!("{:?}", self.up)),
                    ("axes", self.axes.to_string()),
                    ("axes0", self.axes0.to_string()),
                    ("grid", format!("{:?}", self.grid)),
                    ("ticks", self.ticks.to_string()),
                    ("transparent", self.transparent.to_string()),
                    ("black_edges", self.black_edges.to_string()),
                    ("explode", self.explode.to_string()),
                    ("collapse", self.collapse.to_string()),
                    ("tab", format!("{:?}", self.tab)),
                    ("clip_intersection", self.clip_intersection.to_string()),
                    ("clip_planes", self.clip_planes.to_string()),
                    ("clip_normals", format!("{:?}", self.clip_normals)),
                    ("clip_sliders", format!("{:?}", self.clip_sliders)),
                    ("reset_camera", self.reset_camera.to_string()),
                    ("position", opt(&self.position)),
                    ("quaternion", opt(&self.quaternion)),
                    ("target", opt(&self.target)),
                    ("zoom", opt(&self.zoom)),
                    ("position0", opt(&self.position0)),
                    ("quaternion0", opt(&self.quaternion0)),
                    ("target0", opt(&self.target0)),
                    ("zoom0", opt(&self.zoom0)),
                    ("zoom_speed", self.zoom_speed.to_string()),
                    ("pan_speed", self.pan_speed.to_string()),
                    ("rotate_speed", self.rotate_speed.to_string()),
                    ("animation_speed", self.animation_speed.to_string()),
                    ("state_updates", format!("{:?}", self.state_updates)),
                    ("lastPick", opt(&self.last_pick)),
                ],
            ),
            (
                "INTERNAL",
                vec![
                    ("result", opt(&self.result)),
                    ("disposed", self.disposed.to_string()),
                    ("initialize", self.initialize.to_string()),
                    ("js_debug", self.js_debug.to_string()),
                    ("image_id", opt(&self.image_id)),
                ],
            ),
        ];

        for (title, fields) in sections {
            let _ = writeln!(out, "{title}");
            for (name, value) in fields {
                let _ = writeln!(out, "  {name:<20}{value}");
            }
        }
        out
    }
}

/// Owns the widget state and the sync channel.
///
/// Outside [`hold_sync`](Self::hold_sync) every [`set`](Self::set) sends one
/// `update` message. Inside it, changes are staged (the last write per key
/// wins) and sent as a single message when the outermost hold ends.
pub struct PropertyModel<C> {
    comm: C,
    state: WidgetState,
    hold_depth: usize,
    staged: Vec<Property>,
    flushes: usize,
}

impl<C: Comm> PropertyModel<C> {
    pub fn new(comm: C, state: WidgetState) -> Self {
        Self {
            comm,
            state,
            hold_depth: 0,
            staged: Vec::new(),
            flushes: 0,
        }
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn comm_mut(&mut self) -> &mut C {
        &mut self.comm
    }

    /// Number of `update` messages sent so far
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn is_holding(&self) -> bool {
        self.hold_depth > 0
    }

    /// Change a caller-writable property
    pub fn set(&mut self, property: Property) -> Result<(), WidgetError> {
        if property.is_read_only() {
            return Err(ValidationError::NotWritable(property.key().to_string()).into());
        }
        self.sync(property)
    }

    /// Change any property, read-only ones included
    pub(crate) fn sync(&mut self, property: Property) -> Result<(), WidgetError> {
        if self.is_holding() {
            let key = property.key();
            match self.staged.iter_mut().find(|p| p.key() == key) {
                Some(slot) => *slot = property,
                None => self.staged.push(property),
            }
            Ok(())
        } else {
            self.send_update(vec![property])
        }
    }

    /// Change the local mirror only, without telling the viewer
    pub(crate) fn apply_local(&mut self, property: Property) {
        self.state.apply(property);
    }

    /// Run `f` with notifications held, then send everything it changed at once.
    ///
    /// If `f` fails, the changes it staged are dropped and nothing is sent.
    pub fn hold_sync<T, F>(&mut self, f: F) -> Result<T, WidgetError>
    where
        F: FnOnce(&mut Self) -> Result<T, WidgetError>,
    {
        let snapshot = self.staged.clone();
        self.hold_depth += 1;
        let result = f(self);
        self.hold_depth -= 1;

        match result {
            Ok(value) => {
                if self.hold_depth == 0 {
                    let staged = std::mem::take(&mut self.staged);
                    self.send_update(staged)?;
                }
                Ok(value)
            }
            Err(e) => {
                self.staged = snapshot;
                Err(e)
            }
        }
    }

    fn send_update(&mut self, properties: Vec<Property>) -> Result<(), WidgetError> {
        if properties.is_empty() {
            return Ok(());
        }

        let mut state = Map::new();
        let mut buffers = Vec::new();
        let mut buffer_paths = Vec::new();
        for property in &properties {
            let field = property.clone().into_wire()?;
            state.insert(field.key.to_string(), field.value);
            buffers.extend(field.buffers);
            buffer_paths.extend(field.buffer_paths);
        }

        let keys: Vec<&str> = properties.iter().map(Property::key).collect();
        tracing::debug!(?keys, buffers = buffers.len(), "Sending property update");
        self.comm.send(
            ControllerToViewer::Update {
                state,
                buffer_paths,
            },
            buffers,
        )?;
        self.flushes += 1;

        for property in properties {
            self.state.apply(property);
        }
        Ok(())
    }

    /// Apply an inbound state map; returns the decoded properties
    pub fn apply_remote(&mut self, state: Map<String, Value>) -> Vec<Property> {
        let mut applied = Vec::with_capacity(state.len());
        for (key, value) in state {
            match Property::from_wire(&key, value) {
                Ok(property) => {
                    self.state.apply(property.clone());
                    applied.push(property);
                }
                Err(e) => tracing::warn!(%key, "Ignoring viewer update: {e}"),
            }
        }
        applied
    }
}
