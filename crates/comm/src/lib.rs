//! Sync channel abstractions for cadview
//!
//! Defines the `Comm` trait the widget controller talks through, and an
//! in-process channel implementation used by hosts and tests.

mod channel;

pub use channel::{ChannelComm, ChannelCommHandle};

use cadview_ipc::{ControllerToViewer, ViewerToController};

/// Errors that can occur on the sync channel
#[derive(Debug, thiserror::Error)]
pub enum CommError {
    /// Failed to hand a message to the transport
    #[error("Failed to send message to viewer: {0}")]
    SendFailed(String),

    /// The other side has gone away
    #[error("Sync channel is closed")]
    Closed,
}

/// Bidirectional message channel between the controller and the viewer
pub trait Comm {
    /// Send a message with its out-of-band binary buffers (non-blocking)
    fn send(
        &mut self,
        message: ControllerToViewer,
        buffers: Vec<Vec<u8>>,
    ) -> Result<(), CommError>;

    /// Try to receive a message from the viewer (non-blocking)
    fn try_recv(&mut self) -> Option<ViewerToController>;

    /// Whether messages can still be sent
    fn is_open(&self) -> bool {
        true
    }
}

impl<C: Comm + ?Sized> Comm for Box<C> {
    fn send(
        &mut self,
        message: ControllerToViewer,
        buffers: Vec<Vec<u8>>,
    ) -> Result<(), CommError> {
        (**self).send(message, buffers)
    }

    fn try_recv(&mut self) -> Option<ViewerToController> {
        (**self).try_recv()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
