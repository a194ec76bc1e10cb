//! Texture sampling capability.
//!
//! Decoding is delegated to the `image` crate; the renderer only asks for a
//! colour at a `[0,1] x [0,1]` coordinate.

use std::path::Path;

use image::Rgb32FImage;

use crate::util::{Error, Result, Vec2, Vec3};

/// Anything that can be sampled by texture coordinate.
pub trait Texture: Send + Sync {
    /// Linear RGB sample at `uv`. `u` wraps, `v` is clamped.
    fn sample(&self, uv: Vec2) -> Vec3;
}

/// Texture backed by a decoded image (LDR or HDR).
pub struct ImageTexture {
    image: Rgb32FImage,
}

impl ImageTexture {
    /// Load any format the `image` crate understands.
    #[tracing::instrument]
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let image = image::open(path)?.to_rgb32f();
        tracing::debug!(width = image.width(), height = image.height(), "texture loaded");
        Ok(Self::from_image(image))
    }

    pub fn from_image(image: Rgb32FImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    fn texel(&self, x: i64, y: i64) -> Vec3 {
        let w = self.image.width() as i64;
        let h = self.image.height() as i64;
        let x = x.rem_euclid(w) as u32;
        let y = y.clamp(0, h - 1) as u32;
        Vec3::from(self.image.get_pixel(x, y).0)
    }
}

impl std::fmt::Debug for ImageTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImageTexture({}x{})", self.width(), self.height())
    }
}

impl Texture for ImageTexture {
    fn sample(&self, uv: Vec2) -> Vec3 {
        if self.image.width() == 0 || self.image.height() == 0 || !uv.is_finite() {
            return Vec3::ZERO;
        }
        // Keep the texel indices small; wrap u and clamp v up front
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.clamp(0.0, 1.0);
        // Image rows run top to bottom, v runs bottom to top
        let x = u * self.image.width() as f32 - 0.5;
        let y = (1.0 - v) * self.image.height() as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), fx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }
}
