//! Shared configuration for cadview
//!
//! This crate is the single source of truth for the viewer's display layout
//! (canvas and tree sizes, theme, sidecar placement) and for the per-render
//! show options. Show options are sparse: every field is optional and
//! [`ShowOptions::merge_defaults`] is the one place where defaults are filled in.

use serde::{Deserialize, Serialize};

/// Default canvas width in pixels
pub const DEFAULT_CAD_WIDTH: u32 = 800;

/// Smallest canvas width the viewer UI can lay out
pub const MIN_CAD_WIDTH: u32 = 640;

/// Default canvas height in pixels
pub const DEFAULT_HEIGHT: u32 = 600;

/// Default navigation tree width in pixels
pub const DEFAULT_TREE_WIDTH: u32 = 240;

/// Smallest navigation tree width
pub const MIN_TREE_WIDTH: u32 = 240;

/// Default edge color in web format
pub const DEFAULT_EDGE_COLOR: &str = "#707070";

/// Default opacity used for transparent objects
pub const DEFAULT_OPACITY: f64 = 0.5;

/// Default ambient light intensity
pub const DEFAULT_AMBIENT_INTENSITY: f64 = 0.5;

/// Default intensity of the direct lights
pub const DEFAULT_DIRECT_INTENSITY: f64 = 0.3;

/// Default material metalness
pub const DEFAULT_METALNESS: f64 = 0.3;

/// Default material roughness
pub const DEFAULT_ROUGHNESS: f64 = 0.65;

/// Default grid tick hint
pub const DEFAULT_TICKS: u32 = 10;

/// Errors raised when a configuration violates a construction-time invariant
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Ensure cad_width >= {min} (got {actual})")]
    CadWidthTooSmall { actual: u32, min: u32 },

    #[error("Ensure tree_width >= {min} (got {actual})")]
    TreeWidthTooSmall { actual: u32, min: u32 },

    #[error("Height must be greater than zero")]
    ZeroHeight,
}

/// UI theme of the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Where a sidecar viewer is placed in the notebook UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    Right,
    Left,
    Tab,
    SplitRight,
    SplitLeft,
    SplitTop,
    SplitBottom,
}

/// Camera manipulation scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    /// Free rotation, orientation carried as a quaternion
    #[default]
    Trackball,
    /// Rotation around a fixed up axis, orientation computed by the viewer
    Orbit,
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Control::Trackball => f.write_str("trackball"),
            Control::Orbit => f.write_str("orbit"),
        }
    }
}

/// Up-axis convention of the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpAxis {
    Y,
    #[default]
    Z,
}

/// How large numeric arrays are put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// zlib-compressed, base64-encoded blocks inlined in the JSON state
    Compressed,
    /// Raw little-endian buffers sent out-of-band next to the JSON state
    #[default]
    Binary,
}

/// Display configuration, fixed when the viewer is constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Width of the canvas element
    pub cad_width: u32,
    /// Height of the canvas element
    pub height: u32,
    /// Width of the navigation tree element
    pub tree_width: u32,
    pub theme: Theme,
    /// Whether the viewer offers replacing itself with a PNG screenshot
    pub pinning: bool,
    /// Transparent overlay ("glass") layout of tree and toolbar
    pub glass: bool,
    /// Sidecar title; `None` renders the viewer inline
    pub title: Option<String>,
    pub anchor: Option<Anchor>,
    /// Wire encoding used for scene payloads
    pub encoding: PayloadEncoding,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            cad_width: DEFAULT_CAD_WIDTH,
            height: DEFAULT_HEIGHT,
            tree_width: DEFAULT_TREE_WIDTH,
            theme: Theme::default(),
            pinning: false,
            glass: false,
            title: None,
            anchor: None,
            encoding: PayloadEncoding::default(),
        }
    }
}

impl DisplayConfig {
    /// Create a display config with the given canvas dimensions
    pub fn new(cad_width: u32, height: u32) -> Self {
        Self {
            cad_width,
            height,
            ..Default::default()
        }
    }

    /// Check the construction-time invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cad_width < MIN_CAD_WIDTH {
            return Err(ConfigError::CadWidthTooSmall {
                actual: self.cad_width,
                min: MIN_CAD_WIDTH,
            });
        }
        if self.tree_width < MIN_TREE_WIDTH {
            return Err(ConfigError::TreeWidthTooSmall {
                actual: self.tree_width,
                min: MIN_TREE_WIDTH,
            });
        }
        if self.height == 0 {
            return Err(ConfigError::ZeroHeight);
        }
        Ok(())
    }

    /// Total widget width (tree plus canvas)
    pub fn total_width(&self) -> u32 {
        self.tree_width + self.cad_width
    }
}

/// Sparse per-render options, as given by the caller of `add_shapes`.
///
/// Use struct update syntax and leave everything else unset:
///
/// ```
/// use cadview_config::{Control, ShowOptions};
///
/// let options = ShowOptions {
///     control: Some(Control::Orbit),
///     axes: Some(true),
///     ..Default::default()
/// };
/// assert_eq!(options.merge_defaults().control, Control::Orbit);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowOptions {
    // render appearance
    pub normal_len: Option<f64>,
    pub default_edge_color: Option<String>,
    pub default_opacity: Option<f64>,
    pub ambient_intensity: Option<f64>,
    pub direct_intensity: Option<f64>,
    pub metalness: Option<f64>,
    pub roughness: Option<f64>,

    // viewer behavior
    pub tools: Option<bool>,
    pub control: Option<Control>,
    pub up: Option<UpAxis>,
    pub ortho: Option<bool>,
    pub axes: Option<bool>,
    pub axes0: Option<bool>,
    pub grid: Option<[bool; 3]>,
    pub ticks: Option<u32>,
    pub transparent: Option<bool>,
    pub black_edges: Option<bool>,
    pub explode: Option<bool>,
    pub collapse: Option<u8>,
    pub clip_intersection: Option<bool>,
    pub clip_planes: Option<bool>,
    pub clip_object_colors: Option<bool>,

    // camera
    pub position: Option<[f64; 3]>,
    pub quaternion: Option<[f64; 4]>,
    pub target: Option<[f64; 3]>,
    pub zoom: Option<f64>,
    pub reset_camera: Option<bool>,

    // interaction speeds
    pub zoom_speed: Option<f64>,
    pub pan_speed: Option<f64>,
    pub rotate_speed: Option<f64>,

    // debugging
    pub timeit: Option<bool>,
    pub js_debug: Option<bool>,
}

/// Show options with every default filled in.
///
/// Camera fields stay optional: a missing camera value is computed from the
/// scene bounds when the camera is reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowSettings {
    pub normal_len: f64,
    pub default_edge_color: String,
    pub default_opacity: f64,
    pub ambient_intensity: f64,
    pub direct_intensity: f64,
    pub metalness: f64,
    pub roughness: f64,

    pub tools: bool,
    pub control: Control,
    pub up: UpAxis,
    pub ortho: bool,
    pub axes: bool,
    pub axes0: bool,
    pub grid: [bool; 3],
    pub ticks: u32,
    pub transparent: bool,
    pub black_edges: bool,
    pub explode: bool,
    pub collapse: u8,
    pub clip_intersection: bool,
    pub clip_planes: bool,
    pub clip_object_colors: bool,

    pub position: Option<[f64; 3]>,
    pub quaternion: Option<[f64; 4]>,
    pub target: Option<[f64; 3]>,
    pub zoom: Option<f64>,
    pub reset_camera: bool,

    pub zoom_speed: f64,
    pub pan_speed: f64,
    pub rotate_speed: f64,

    pub timeit: bool,
    pub js_debug: bool,
}

impl ShowOptions {
    /// Fill every unset option with its default
    pub fn merge_defaults(self) -> ShowSettings {
        ShowSettings {
            normal_len: self.normal_len.unwrap_or(0.0),
            default_edge_color: normalize_color(
                self.default_edge_color
                    .as_deref()
                    .unwrap_or(DEFAULT_EDGE_COLOR),
            ),
            default_opacity: self.default_opacity.unwrap_or(DEFAULT_OPACITY),
            ambient_intensity: self.ambient_intensity.unwrap_or(DEFAULT_AMBIENT_INTENSITY),
            direct_intensity: self.direct_intensity.unwrap_or(DEFAULT_DIRECT_INTENSITY),
            metalness: self.metalness.unwrap_or(DEFAULT_METALNESS),
            roughness: self.roughness.unwrap_or(DEFAULT_ROUGHNESS),

            tools: self.tools.unwrap_or(true),
            control: self.control.unwrap_or_default(),
            up: self.up.unwrap_or_default(),
            ortho: self.ortho.unwrap_or(true),
            axes: self.axes.unwrap_or(false),
            axes0: self.axes0.unwrap_or(false),
            grid: self.grid.unwrap_or([false; 3]),
            ticks: self.ticks.unwrap_or(DEFAULT_TICKS),
            transparent: self.transparent.unwrap_or(false),
            black_edges: self.black_edges.unwrap_or(false),
            explode: self.explode.unwrap_or(false),
            collapse: self.collapse.unwrap_or(1),
            clip_intersection: self.clip_intersection.unwrap_or(false),
            clip_planes: self.clip_planes.unwrap_or(false),
            clip_object_colors: self.clip_object_colors.unwrap_or(false),

            position: self.position,
            quaternion: self.quaternion,
            target: self.target,
            zoom: self.zoom,
            reset_camera: self.reset_camera.unwrap_or(true),

            zoom_speed: self.zoom_speed.unwrap_or(1.0),
            pan_speed: self.pan_speed.unwrap_or(1.0),
            rotate_speed: self.rotate_speed.unwrap_or(1.0),

            timeit: self.timeit.unwrap_or(false),
            js_debug: self.js_debug.unwrap_or(false),
        }
    }
}

impl Default for ShowSettings {
    fn default() -> Self {
        ShowOptions::default().merge_defaults()
    }
}

/// Prefix a web color with `#` if the caller left it off
pub fn normalize_color(color: &str) -> String {
    if color.starts_with('#') {
        color.to_string()
    } else {
        format!("#{color}")
    }
}
