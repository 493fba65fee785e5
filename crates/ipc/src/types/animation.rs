//! Animation tracks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What an animation track changes on its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackAction {
    /// Translation by a 3-vector
    #[serde(rename = "t")]
    Translate,
    #[serde(rename = "tx")]
    TranslateX,
    #[serde(rename = "ty")]
    TranslateY,
    #[serde(rename = "tz")]
    TranslateZ,
    /// Rotation by a quaternion
    #[serde(rename = "q")]
    Quaternion,
    /// Rotation around the x axis in degrees
    #[serde(rename = "rx")]
    RotateX,
    #[serde(rename = "ry")]
    RotateY,
    #[serde(rename = "rz")]
    RotateZ,
}

impl TrackAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackAction::Translate => "t",
            TrackAction::TranslateX => "tx",
            TrackAction::TranslateY => "ty",
            TrackAction::TranslateZ => "tz",
            TrackAction::Quaternion => "q",
            TrackAction::RotateX => "rx",
            TrackAction::RotateY => "ry",
            TrackAction::RotateZ => "rz",
        }
    }

    /// Number of components per value, 1 for scalar actions
    pub fn arity(self) -> usize {
        match self {
            TrackAction::Translate => 3,
            TrackAction::Quaternion => 4,
            _ => 1,
        }
    }

    fn expected(self) -> &'static str {
        match self.arity() {
            3 => "3-dim vectors",
            4 => "4-dim quaternions",
            _ => "scalars",
        }
    }
}

impl fmt::Display for TrackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "t" => TrackAction::Translate,
            "tx" => TrackAction::TranslateX,
            "ty" => TrackAction::TranslateY,
            "tz" => TrackAction::TranslateZ,
            "q" => TrackAction::Quaternion,
            "rx" => TrackAction::RotateX,
            "ry" => TrackAction::RotateY,
            "rz" => TrackAction::RotateZ,
            other => return Err(ValidationError::InvalidAction(other.to_string())),
        })
    }
}

/// One keyframe value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl TrackValue {
    fn components(&self) -> Option<usize> {
        match self {
            TrackValue::Scalar(_) => None,
            TrackValue::Vector(v) => Some(v.len()),
        }
    }
}

impl From<f64> for TrackValue {
    fn from(v: f64) -> Self {
        TrackValue::Scalar(v)
    }
}

impl From<[f64; 3]> for TrackValue {
    fn from(v: [f64; 3]) -> Self {
        TrackValue::Vector(v.to_vec())
    }
}

impl From<[f64; 4]> for TrackValue {
    fn from(v: [f64; 4]) -> Self {
        TrackValue::Vector(v.to_vec())
    }
}

type TrackTuple = (String, TrackAction, Vec<f64>, Vec<TrackValue>);

/// Keyframes of one action on one object (or subtree).
///
/// Serialized as `[path, action, times, values]`. Only constructible through
/// [`AnimationTrack::new`], so every instance has matching lengths, ordered
/// times, and values of the right arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrackTuple", into = "TrackTuple")]
pub struct AnimationTrack {
    path: String,
    action: TrackAction,
    times: Vec<f64>,
    values: Vec<TrackValue>,
}

impl AnimationTrack {
    pub fn new(
        path: impl Into<String>,
        action: TrackAction,
        times: Vec<f64>,
        values: Vec<TrackValue>,
    ) -> Result<Self, ValidationError> {
        if times.len() != values.len() {
            return Err(ValidationError::TrackLengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }

        let expected = match action.arity() {
            1 => None,
            n => Some(n),
        };
        if let Some(index) = values.iter().position(|v| v.components() != expected) {
            return Err(ValidationError::WrongValueArity {
                action,
                expected: action.expected(),
                index,
            });
        }

        if let Some(index) = times.iter().position(|t| !t.is_finite()) {
            return Err(ValidationError::UnorderedTimes(index));
        }
        if let Some(index) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(ValidationError::UnorderedTimes(index + 1));
        }

        Ok(Self {
            path: path.into(),
            action,
            times,
            values,
        })
    }

    /// Same as [`AnimationTrack::new`] with the action given by its short name
    pub fn parse(
        path: impl Into<String>,
        action: &str,
        times: Vec<f64>,
        values: Vec<TrackValue>,
    ) -> Result<Self, ValidationError> {
        Self::new(path, action.parse()?, times, values)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn action(&self) -> TrackAction {
        self.action
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[TrackValue] {
        &self.values
    }

    /// Whether the track targets `id` or an ancestor of it
    pub fn applies_to(&self, id: &str) -> bool {
        format!("{id}/").starts_with(&format!("{}/", self.path))
    }
}

impl TryFrom<TrackTuple> for AnimationTrack {
    type Error = ValidationError;

    fn try_from((path, action, times, values): TrackTuple) -> Result<Self, Self::Error> {
        Self::new(path, action, times, values)
    }
}

impl From<AnimationTrack> for TrackTuple {
    fn from(track: AnimationTrack) -> Self {
        (track.path, track.action, track.times, track.values)
    }
}
