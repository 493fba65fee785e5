//! Type definitions for IPC messages.

mod animation;
mod array;
mod camera;
mod payload;
mod results;
mod scene;
mod value;

pub use animation::*;
pub use array::*;
pub use camera::*;
pub use payload::*;
pub use results::*;
pub use scene::*;
pub use value::*;
