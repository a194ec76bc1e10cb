//! Ray-cast view: full picture captures and the per-frame present pass.

use std::time::Instant;

use glam::{Mat4, Vec2, Vec3};
use rayon::prelude::*;

use crate::camera;
use crate::scene::{ObjectId, Scene};
use crate::tracer::PathTracer;
use crate::util::{Error, Result};

/// Fully assembled capture: linear RGB, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl CapturedImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Vec3] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

/// Normalized device coordinate of the centre of pixel `(x, y)`.
pub fn pixel_ndc(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32 * 2.0 - 1.0,
        1.0 - (y as f32 + 0.5) / height as f32 * 2.0,
    )
}

/// Offline renderer driving the [`PathTracer`] over an image grid.
pub struct ViewRayCaster {
    pub pathtracer: PathTracer,
    width: u32,
    height: u32,
    /// Latest capture, shown by [`ViewRayCaster::render`].
    last_picture: Option<CapturedImage>,
    captures: u64,
    frames_presented: u64,
    picture_presented: bool,
}

impl ViewRayCaster {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::config(format!("picture size must be non-zero, got {width}x{height}")));
        }
        Ok(Self {
            pathtracer: PathTracer::new(),
            width,
            height,
            last_picture: None,
            captures: 0,
            frames_presented: 0,
            picture_presented: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Trace one ray per pixel and return the finished image.
    ///
    /// Blocks until every pixel is done. Rows are traced in parallel; the
    /// image is only handed out once complete, and any failing ray discards
    /// the whole capture.
    #[tracing::instrument(skip_all, fields(width = self.width, height = self.height))]
    pub fn take_picture(&mut self, camera_pos: Vec3, mvp: Mat4, scene: &Scene) -> Result<CapturedImage> {
        let started = Instant::now();
        self.pathtracer.reset_stats();

        let (width, height) = (self.width, self.height);
        let inv_mvp = mvp.inverse();
        if !inv_mvp.is_finite() {
            return Err(Error::other("view-projection transform is not invertible"));
        }

        let tracer = &self.pathtracer;
        let rows: Vec<Vec<Vec3>> = (0..height)
            .into_par_iter()
            .map(|y| {
                (0..width)
                    .map(|x| -> Result<Vec3> {
                        let ray = camera::ray_through(camera_pos, &inv_mvp, pixel_ndc(x, y, width, height))?;
                        Ok(tracer.trace_ray(&ray, scene))
                    })
                    .collect::<Result<Vec<Vec3>>>()
            })
            .collect::<Result<_>>()?;

        let image = CapturedImage {
            width,
            height,
            pixels: rows.into_iter().flatten().collect(),
        };

        self.captures += 1;
        let stats = self.pathtracer.stats();
        tracing::info!(
            "Picture {} done in {:.2?}: {} primary rays, {} shadow rays",
            self.captures,
            started.elapsed(),
            stats.primary_rays,
            stats.shadow_rays
        );

        self.last_picture = Some(image.clone());
        self.picture_presented = false;
        Ok(image)
    }

    /// Single diagnostic ray along the view-forward direction.
    pub fn oneshot(&self, camera_pos: Vec3, mvp: Mat4, scene: &Scene) -> Result<Option<ObjectId>> {
        let ray = camera::ray_through(camera_pos, &mvp.inverse(), Vec2::ZERO)?;
        self.pathtracer.debug_trace(ray.origin, ray.direction, scene)
    }

    /// Lightweight per-frame pass: presents the latest capture, never traces.
    pub fn render(&mut self) -> Option<&CapturedImage> {
        self.frames_presented += 1;
        if let Some(picture) = &self.last_picture {
            if !self.picture_presented {
                tracing::debug!("presenting picture {}", self.captures);
                self.picture_presented = true;
            }
            return Some(picture);
        }
        None
    }

    /// Number of completed captures.
    pub fn captures(&self) -> u64 {
        self.captures
    }

    /// Number of `render` calls.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}
