//! Results the viewer hands back through the `result` property.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IpcError;

/// A rendered image the viewer produced on request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewerResult {
    /// Screenshot to be shown in place of the viewer output
    Image {
        display_id: String,
        src: String,
        width: u32,
        height: u32,
    },
    /// Screenshot to be saved; `src` is a data URI
    File { filename: String, src: String },
}

impl ViewerResult {
    pub fn parse(text: &str) -> Result<Self, IpcError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Description of the most recently picked object.
pub type LastPick = Map<String, Value>;
