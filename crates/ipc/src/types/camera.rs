//! Camera pose and viewer navigation types.

use serde::{Deserialize, Serialize};

/// Camera pose as the viewer reports it.
///
/// `quaternion` is absent under orbit control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: [f64; 3],
    pub quaternion: Option<[f64; 4]>,
    pub target: [f64; 3],
    pub zoom: f64,
}

/// Named camera directions understood by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPreset {
    Iso,
    Top,
    Bottom,
    Left,
    Right,
    Front,
    Rear,
}

impl CameraPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            CameraPreset::Iso => "iso",
            CameraPreset::Top => "top",
            CameraPreset::Bottom => "bottom",
            CameraPreset::Left => "left",
            CameraPreset::Right => "right",
            CameraPreset::Front => "front",
            CameraPreset::Rear => "rear",
        }
    }
}

/// Side panel tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Tree,
    Clip,
}
