//! Error types for the widget controller.

use cadview_comm::CommError;
use cadview_config::{ConfigError, Control};
use cadview_ipc::{IpcError, ValidationError};

use crate::encode::EncodeError;
use crate::path::PathError;

/// Errors surfaced by viewer operations.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    /// A command path could not be parsed; nothing was sent
    #[error(transparent)]
    Addressing(#[from] PathError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The viewer has been disposed in the browser
    #[error("Viewer has been disposed")]
    Disposed,

    #[error("Operation {operation} needs {required} camera control")]
    ControlMismatch {
        operation: &'static str,
        required: Control,
    },

    #[error(transparent)]
    Comm(#[from] CommError),

    #[error(transparent)]
    Ipc(#[from] IpcError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid result payload: {0}")]
    InvalidResult(String),
}
