//! Notebook-side controller for the cadview CAD viewer
//!
//! This crate drives a browser-side viewer through a [`Comm`] sync channel:
//! it encodes scene trees, keeps the synchronized properties in a local
//! mirror, batches changes with `hold_sync`, and calls viewer methods by
//! object path.
//!
//! ```no_run
//! use cadview_comm::ChannelComm;
//! use cadview_config::{DisplayConfig, ShowOptions};
//! use cadview_widget::CadViewer;
//! # use cadview_ipc::{ShapeNode, VisibilityMap};
//! # fn tree() -> ShapeNode { unimplemented!() }
//!
//! let (comm, _handle) = ChannelComm::new();
//! let mut viewer = CadViewer::new(DisplayConfig::default(), comm)?;
//! viewer.add_shapes(tree(), VisibilityMap::new(), Vec::new(), ShowOptions::default())?;
//! viewer.rotate_x(30.0)?;
//! # Ok::<(), cadview_widget::WidgetError>(())
//! ```

mod camera;
mod dispatch;
pub mod encode;
mod error;
mod events;
pub mod geometry;
mod model;
mod path;
mod registry;
mod results;
mod viewer;

pub use camera::{
    CAMERA_DISTANCE_FACTOR, CameraRequest, DEFAULT_QUATERNION, DEGENERATE_SCENE_RADIUS,
    default_position,
};
pub use dispatch::{CommandDispatcher, PendingCommand};
pub use encode::{EncodeError, encode};
pub use error::WidgetError;
pub use events::{EventBus, EventKind, SubscriptionId, ViewerEvent};
pub use geometry::CombinedBox;
pub use model::{PropertyModel, WidgetState};
pub use path::{ObjectPath, PathError, PathSegment};
pub use registry::ViewerRegistry;
pub use results::{ByteSink, DisplaySink, ResultRouter, Routed, decode_data_uri, image_html};
pub use viewer::CadViewer;

pub use cadview_comm::Comm;
