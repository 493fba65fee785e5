//! Error types for IPC operations and payload validation.

use crate::types::TrackAction;

/// Errors that can occur during IPC operations.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),
}

/// A payload or parameter combination that the viewer cannot accept.
///
/// Raised synchronously, before any state is mutated or sent.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Track times and values need to have same length ({times} != {values})")]
    TrackLengthMismatch { times: usize, values: usize },

    #[error("'{0}' is not a valid action, expected one of t, tx, ty, tz, q, rx, ry, rz")]
    InvalidAction(String),

    #[error("Values need to be {expected} for action '{action}' (offending index {index})")]
    WrongValueArity {
        action: TrackAction,
        expected: &'static str,
        index: usize,
    },

    #[error("Track times need to be finite and non-decreasing (offending index {0})")]
    UnorderedTimes(usize),

    #[error("{0} is not a valid subpath of any loaded object")]
    UnknownTrackPath(String),

    #[error("Unknown object id in visibility state: {0}")]
    UnknownStateKey(String),

    #[error("Visibility flags need to be 0 or 1, got {0:?}")]
    InvalidVisibilityFlag([u8; 2]),

    #[error("Camera quaternion cannot be used with orbit camera control")]
    QuaternionWithOrbit,

    #[error("For trackball camera control, a position also needs a quaternion")]
    PositionWithoutQuaternion,

    #[error("Duplicate object id: {0}")]
    DuplicateId(String),

    #[error("Object id {child} is not below its parent {parent}")]
    NotBelowParent { parent: String, child: String },

    #[error("Array shape {shape:?} does not match {len} elements")]
    ShapeMismatch { shape: Vec<usize>, len: usize },

    #[error("Scene contains no object with a bounding box")]
    EmptyScene,

    #[error("Property '{0}' cannot be set directly")]
    NotWritable(String),
}
