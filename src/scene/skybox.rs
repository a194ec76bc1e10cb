//! Direction-indexed backdrop used when a ray leaves the scene.

use std::f32::consts::PI;
use std::sync::Arc;

use crate::util::{Vec2, Vec3};

use super::texture::Texture;

/// Environment backdrop.
#[derive(Clone)]
pub enum Skybox {
    /// Same colour in every direction.
    Solid(Vec3),
    /// Vertical blend from `horizon` (y = 0 and below) to `zenith` (y = 1).
    Gradient { horizon: Vec3, zenith: Vec3 },
    /// Equirectangular environment map.
    Texture(Arc<dyn Texture>),
}

impl Default for Skybox {
    fn default() -> Self {
        Self::Gradient {
            horizon: Vec3::new(0.55, 0.6, 0.7),
            zenith: Vec3::new(0.1, 0.2, 0.45),
        }
    }
}

impl std::fmt::Debug for Skybox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solid(c) => write!(f, "Skybox::Solid({c:?})"),
            Self::Gradient { horizon, zenith } => {
                write!(f, "Skybox::Gradient({horizon:?} -> {zenith:?})")
            }
            Self::Texture(_) => write!(f, "Skybox::Texture"),
        }
    }
}

impl Skybox {
    /// Backdrop colour seen along unit `direction`.
    pub fn sample(&self, direction: Vec3) -> Vec3 {
        match self {
            Self::Solid(color) => *color,
            Self::Gradient { horizon, zenith } => horizon.lerp(*zenith, direction.y.clamp(0.0, 1.0)),
            Self::Texture(texture) => texture.sample(equirect_uv(direction)),
        }
    }
}

/// Map a unit direction to equirectangular `(u, v)`; `+Y` is up.
pub fn equirect_uv(direction: Vec3) -> Vec2 {
    let u = 0.5 + direction.z.atan2(direction.x) / (2.0 * PI);
    let v = 0.5 + direction.y.clamp(-1.0, 1.0).asin() / PI;
    Vec2::new(u, v)
}
