//! IPC message protocol for cadview
//!
//! Defines all message types exchanged between the controller and the
//! browser-side CAD viewer, the schema of synchronized widget properties,
//! and the scene, camera, and animation types those messages carry.
//!
//! Module organization:
//! - `messages`: Sync channel envelopes (`ControllerToViewer`, `ViewerToController`)
//! - `properties`: The closed set of synchronized widget fields
//! - `types`: Scene tree, numeric arrays, camera, animation and result types
//! - `error`: Error types

mod error;
mod messages;
mod properties;
mod types;

pub use error::*;
pub use messages::*;
pub use properties::*;
pub use types::*;

pub use cadview_config::{Anchor, Control, Theme, UpAxis};

/// Serialize an outbound message to its JSON text form
pub fn to_json(message: &ControllerToViewer) -> Result<String, IpcError> {
    Ok(serde_json::to_string(message)?)
}

/// Parse an inbound message from its JSON text form
pub fn from_json(text: &str) -> Result<ViewerToController, IpcError> {
    Ok(serde_json::from_str(text)?)
}
