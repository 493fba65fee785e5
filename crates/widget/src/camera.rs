//! Default camera placement.

use cadview_config::Control;
use cadview_ipc::{CameraState, ValidationError};
use glam::DVec3;

use crate::geometry::{CombinedBox, normalize};

/// Isometric view orientation used when a trackball camera is reset
pub const DEFAULT_QUATERNION: [f64; 4] = [
    0.1759198966061612,
    0.42470820027786693,
    0.8204732385702833,
    0.33985114297998736,
];

/// Camera distance in multiples of the scene's bounding sphere radius
pub const CAMERA_DISTANCE_FACTOR: f64 = 5.5;

/// Radius assumed for scenes without extent, e.g. a single vertex
pub const DEGENERATE_SCENE_RADIUS: f64 = 1.0;

/// Camera values requested by the caller; unset ones are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraRequest {
    pub position: Option<[f64; 3]>,
    pub quaternion: Option<[f64; 4]>,
    pub target: Option<[f64; 3]>,
    pub zoom: Option<f64>,
}

impl CameraRequest {
    /// Reject combinations the viewer cannot honor under `control`
    pub fn validate(&self, control: Control) -> Result<(), ValidationError> {
        match control {
            Control::Orbit if self.quaternion.is_some() => Err(ValidationError::QuaternionWithOrbit),
            Control::Trackball if self.position.is_some() && self.quaternion.is_none() => {
                Err(ValidationError::PositionWithoutQuaternion)
            }
            _ => Ok(()),
        }
    }

    /// Fill every unset value from the scene bounds
    pub fn resolve(&self, control: Control, bounds: &CombinedBox) -> CameraState {
        let quaternion = match control {
            Control::Trackball => Some(self.quaternion.unwrap_or(DEFAULT_QUATERNION)),
            Control::Orbit => None,
        };
        CameraState {
            position: self.position.unwrap_or_else(|| default_position(bounds)),
            quaternion,
            target: self.target.unwrap_or_else(|| bounds.center.to_array()),
            zoom: self.zoom.unwrap_or(1.0),
        }
    }
}

/// Camera position looking at the scene center along the (1, 1, 1) diagonal
pub fn default_position(bounds: &CombinedBox) -> [f64; 3] {
    // (1, 1, 1) always normalizes
    let direction = normalize(DVec3::ONE).unwrap_or(DVec3::ZERO);
    let radius = match bounds.max_distance_from_center() {
        r if r.is_finite() && r > 0.0 => r,
        _ => DEGENERATE_SCENE_RADIUS,
    };
    let distance = CAMERA_DISTANCE_FACTOR * radius;
    (direction * distance + bounds.center).to_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadview_ipc::BoundingBox;

    fn unit_cube() -> CombinedBox {
        CombinedBox::new(BoundingBox::new([-0.5; 3], [0.5; 3]))
    }

    #[test]
    fn test_default_position_for_unit_cube() {
        let position = default_position(&unit_cube());
        for coord in position {
            assert!((coord - 2.75).abs() < 1e-9, "got {position:?}");
        }
    }

    #[test]
    fn test_default_position_is_offset_by_center() {
        let bounds = CombinedBox::new(BoundingBox::new([9.5, -0.5, -0.5], [10.5, 0.5, 0.5]));
        let position = default_position(&bounds);
        assert!((position[0] - 12.75).abs() < 1e-9);
        assert!((position[1] - 2.75).abs() < 1e-9);
    }

    #[test]
    fn test_default_position_for_point_scene() {
        let bounds = CombinedBox::new(BoundingBox::new([0.0; 3], [0.0; 3]));
        let position = DVec3::from_array(default_position(&bounds));
        assert!(position.distance(bounds.center) > 0.0);
        assert!((position.distance(bounds.center) - CAMERA_DISTANCE_FACTOR).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_trackball_defaults() {
        let camera = CameraRequest::default().resolve(Control::Trackball, &unit_cube());
        assert_eq!(camera.quaternion, Some(DEFAULT_QUATERNION));
        assert_eq!(camera.target, [0.0; 3]);
        assert_eq!(camera.zoom, 1.0);
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let request = CameraRequest {
            position: Some([1.0, 2.0, 3.0]),
            quaternion: Some([0.0, 0.0, 0.0, 1.0]),
            target: Some([1.0, 1.0, 1.0]),
            zoom: Some(0.5),
        };
        let camera = request.resolve(Control::Trackball, &unit_cube());
        assert_eq!(camera.position, [1.0, 2.0, 3.0]);
        assert_eq!(camera.quaternion, Some([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(camera.zoom, 0.5);
    }

    #[test]
    fn test_orbit_has_no_quaternion() {
        let camera = CameraRequest::default().resolve(Control::Orbit, &unit_cube());
        assert_eq!(camera.quaternion, None);
    }

    #[test]
    fn test_validate_combinations() {
        let with_quaternion = CameraRequest {
            quaternion: Some(DEFAULT_QUATERNION),
            ..Default::default()
        };
        assert_eq!(
            with_quaternion.validate(Control::Orbit),
            Err(ValidationError::QuaternionWithOrbit)
        );
        assert!(with_quaternion.validate(Control::Trackball).is_ok());

        let position_only = CameraRequest {
            position: Some([1.0; 3]),
            ..Default::default()
        };
        assert_eq!(
            position_only.validate(Control::Trackball),
            Err(ValidationError::PositionWithoutQuaternion)
        );
        assert!(position_only.validate(Control::Orbit).is_ok());
    }
}
