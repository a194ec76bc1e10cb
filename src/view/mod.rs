//! The two views of a scene.
//!
//! - [`preview`]: rasterized every frame, reads input, queues [`Action`]s
//! - [`raycast`]: traces full pictures on demand and presents the latest one

pub mod action;
pub mod input;
pub mod preview;
pub mod raster;
pub mod raycast;

pub use action::{Action, ActionQueue};
pub use input::{InputEvent, InputSource, Key, LineInput, ScriptedInput};
pub use preview::ViewPreview;
pub use raster::Framebuffer;
pub use raycast::{CapturedImage, ViewRayCaster};
