//! Sync channel messages between the controller and the viewer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::PathElement;

/// Messages from the controller to the browser viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ControllerToViewer {
    /// One coalesced batch of property changes.
    ///
    /// Binary buffers travel next to the message; `buffer_paths[i]` is the
    /// location in `state` where buffer `i` belongs.
    Update {
        state: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        buffer_paths: Vec<Vec<PathElement>>,
    },

    /// Custom message addressed to the viewer's JavaScript objects
    Custom { content: CustomContent },
}

/// Content of a custom controller message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomContent {
    /// Call a method on an object reachable from the viewer root.
    ///
    /// The viewer walks all steps of `method` but the last and calls the last
    /// one with `args` spread as positional arguments.
    RemoteMethodCall {
        id: u64,
        method: Vec<PathElement>,
        args: Option<Vec<Value>>,
    },
}

/// Messages from the browser viewer to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ViewerToController {
    /// Properties changed on the viewer side (camera moves, picks, results)
    Update { state: Map<String, Value> },

    /// Free-form custom message
    Custom { content: Value },
}

/// An outbound message together with its out-of-band binary buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: ControllerToViewer,
    pub buffers: Vec<Vec<u8>>,
}

impl Envelope {
    /// The property state carried by an `update` message
    pub fn state(&self) -> Option<&Map<String, Value>> {
        match &self.message {
            ControllerToViewer::Update { state, .. } => Some(state),
            ControllerToViewer::Custom { .. } => None,
        }
    }

    /// The remote method call carried by a `custom` message
    pub fn method_call(&self) -> Option<&CustomContent> {
        match &self.message {
            ControllerToViewer::Custom { content } => Some(content),
            ControllerToViewer::Update { .. } => None,
        }
    }
}
