//! In-process sync channel
//!
//! Uses std channels; the handle side plays the viewer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use cadview_ipc::{ControllerToViewer, Envelope, ViewerToController};
use serde_json::{Map, Value};

use crate::{Comm, CommError};

/// Controller side of an in-process channel
pub struct ChannelComm {
    to_viewer: mpsc::Sender<Envelope>,
    from_viewer: mpsc::Receiver<ViewerToController>,
    open: Arc<AtomicBool>,
}

impl ChannelComm {
    /// Create a new channel pair
    pub fn new() -> (Self, ChannelCommHandle) {
        let (to_viewer_tx, to_viewer_rx) = mpsc::channel();
        let (from_viewer_tx, from_viewer_rx) = mpsc::channel();
        let open = Arc::new(AtomicBool::new(true));

        let comm = Self {
            to_viewer: to_viewer_tx,
            from_viewer: from_viewer_rx,
            open: Arc::clone(&open),
        };

        let handle = ChannelCommHandle {
            to_controller: from_viewer_tx,
            from_controller: to_viewer_rx,
            open,
        };

        (comm, handle)
    }
}

impl Comm for ChannelComm {
    fn send(
        &mut self,
        message: ControllerToViewer,
        buffers: Vec<Vec<u8>>,
    ) -> Result<(), CommError> {
        if !self.is_open() {
            return Err(CommError::Closed);
        }
        self.to_viewer
            .send(Envelope { message, buffers })
            .map_err(|e| CommError::SendFailed(e.to_string()))
    }

    fn try_recv(&mut self) -> Option<ViewerToController> {
        self.from_viewer.try_recv().ok()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// Viewer side of an in-process channel
pub struct ChannelCommHandle {
    to_controller: mpsc::Sender<ViewerToController>,
    from_controller: mpsc::Receiver<Envelope>,
    open: Arc<AtomicBool>,
}

impl ChannelCommHandle {
    /// Try to receive a message from the controller (non-blocking)
    pub fn try_recv(&self) -> Option<Envelope> {
        self.from_controller.try_recv().ok()
    }

    /// All messages sent so far, in order
    pub fn drain(&self) -> Vec<Envelope> {
        self.from_controller.try_iter().collect()
    }

    /// Send a message to the controller
    pub fn send(&self, msg: ViewerToController) {
        if self.to_controller.send(msg).is_err() {
            tracing::warn!("Controller side of sync channel is gone");
        }
    }

    /// Report changed properties to the controller
    pub fn send_update(&self, state: Map<String, Value>) {
        self.send(ViewerToController::Update { state });
    }

    /// Close the channel; later controller sends fail
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}
