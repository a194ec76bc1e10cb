//! Software rasterizer for the interactive preview.
//!
//! Flat-shaded, z-buffered, one colour per triangle. Triangles with any
//! vertex behind the eye are skipped instead of clipped; the preview only
//! needs to be good enough to aim the camera.

use glam::{Vec2, Vec3, Vec4Swizzles};

use crate::camera::CameraState;
use crate::scene::Scene;

/// Smallest clip-space `w` accepted for a vertex.
const MIN_CLIP_W: f32 = 1e-5;

/// Fraction of the albedo visible on surfaces seen edge-on.
const BASE_SHADE: f32 = 0.25;

/// Colour and depth targets of one preview frame.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Vec3>,
    depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![Vec3::ZERO; len],
            depth: vec![f32::INFINITY; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major linear RGB, top row first.
    pub fn pixels(&self) -> &[Vec3] {
        &self.color
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.color[self.index(x, y)]
    }

    pub fn clear(&mut self, color: Vec3) {
        self.color.fill(color);
        self.depth.fill(f32::INFINITY);
    }

    /// Draw every triangle of `scene` as seen by `camera`.
    pub fn draw_scene(&mut self, scene: &Scene, camera: &CameraState) -> usize {
        let mut drawn = 0;
        for mesh in scene.meshes() {
            for tri in mesh.triangles() {
                let albedo = mesh
                    .objects()
                    .get(tri.object as usize)
                    .map(|o| o.material.diffuse)
                    .unwrap_or(Vec3::ZERO);
                let to_eye = (camera.position - tri.centroid()).normalize_or_zero();
                let facing = tri.face_normal().normalize_or_zero().dot(to_eye).abs();
                let color = albedo * (BASE_SHADE + (1.0 - BASE_SHADE) * facing);
                if self.draw_triangle(camera, [tri.v0, tri.v1, tri.v2], color) {
                    drawn += 1;
                }
            }
        }
        drawn
    }

    /// Returns false when the triangle was culled before scan conversion.
    fn draw_triangle(&mut self, camera: &CameraState, verts: [Vec3; 3], color: Vec3) -> bool {
        let size = Vec2::new(self.width as f32, self.height as f32);
        let mut screen = [Vec2::ZERO; 3];
        let mut depth = [0.0f32; 3];
        for (i, v) in verts.iter().enumerate() {
            let clip = camera.mvp * v.extend(1.0);
            if clip.w <= MIN_CLIP_W {
                return false;
            }
            let ndc = clip.xyz() / clip.w;
            screen[i] = Vec2::new((ndc.x + 1.0) * 0.5 * size.x, (1.0 - ndc.y) * 0.5 * size.y);
            depth[i] = ndc.z;
        }

        let area = edge(screen[0], screen[1], screen[2]);
        if area.abs() < f32::EPSILON {
            return false;
        }

        let lo = screen[0].min(screen[1]).min(screen[2]).max(Vec2::ZERO);
        let hi = screen[0].max(screen[1]).max(screen[2]).min(size);
        if lo.x >= hi.x || lo.y >= hi.y {
            return false;
        }

        for y in lo.y.floor() as u32..hi.y.ceil() as u32 {
            for x in lo.x.floor() as u32..hi.x.ceil() as u32 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                // Dividing by the signed area accepts both windings
                let w0 = edge(screen[1], screen[2], p) / area;
                let w1 = edge(screen[2], screen[0], p) / area;
                let w2 = edge(screen[0], screen[1], p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = w0 * depth[0] + w1 * depth[1] + w2 * depth[2];
                if !(-1.0..=1.0).contains(&z) {
                    continue;
                }
                let idx = self.index(x, y);
                if z < self.depth[idx] {
                    self.depth[idx] = z;
                    self.color[idx] = color;
                }
            }
        }
        true
    }
}

/// Twice the signed area of `(a, b, p)`.
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}
