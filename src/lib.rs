//! # Raycaster
//!
//! Renders a triangle scene two ways: a software-rasterized preview for
//! interactive navigation, and a CPU ray tracer that captures full pictures
//! on request.
//!
//! ## Modules
//!
//! - [`util`] - Math types (bounds, rays) and errors
//! - [`scene`] - Meshes, BVH, lights, ambient term, skybox, OBJ import
//! - [`camera`] - Static and fly cameras behind one manager
//! - [`tracer`] - Nearest-hit search and direct lighting with shadows
//! - [`view`] - Preview rasterizer with its action queue, ray-cast view
//! - [`export`] - PNG / HDR / EXR picture output
//! - [`config`] - Run configuration (JSON file + command line)
//! - [`app`] - Batch and interactive main loops
//!
//! ## Example
//!
//! ```ignore
//! use raycaster::prelude::*;
//!
//! let mut scene = Scene::new();
//! scene.add_mesh(raycaster::scene::demo::cornell_box()?);
//! scene.add_point_light(raycaster::scene::demo::CORNELL_LIGHT);
//!
//! let camera = CameraManager::fixed(1.0, 1.0);
//! let mut view = ViewRayCaster::new(256, 256)?;
//! let picture = view.take_picture(camera.camera_pos(), camera.mvp(), &scene)?;
//! ```

pub mod app;
pub mod camera;
pub mod config;
pub mod export;
pub mod scene;
pub mod tracer;
pub mod util;
pub mod view;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::app::App;
    pub use crate::camera::{CameraManager, CameraState};
    pub use crate::config::Config;
    pub use crate::export::{ImageFileSink, PictureSink};
    pub use crate::scene::{Mesh, ObjectId, PointLight, Scene, Skybox};
    pub use crate::tracer::PathTracer;
    pub use crate::util::{Error, Result};
    pub use crate::view::{Action, ViewPreview, ViewRayCaster};
}
