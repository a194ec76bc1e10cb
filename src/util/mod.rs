//! Utility types shared across the renderer.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam, [`BBox3f`] and [`Ray`]

mod error;
mod math;

pub use error::*;
pub use math::*;
