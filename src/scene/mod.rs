//! Scene data shared by the preview rasterizer and the ray tracer.
//!
//! The scene is assembled once during setup (meshes, lights, ambient term,
//! backdrop) and then only read. Setup methods take `&mut self`, renderers
//! take `&Scene`, so the borrow checker keeps the two phases apart.

pub mod build;
pub mod bvh;
pub mod demo;
pub mod mesh;
pub mod skybox;
pub mod texture;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::{BBox3f, Result, Vec3};

pub use bvh::{Triangle, TriangleHit};
pub use mesh::{Material, Mesh, MeshHit, MeshObject};
pub use skybox::Skybox;
pub use texture::{ImageTexture, Texture};

/// Ambient term used while the scene has no point lights.
pub const DEFAULT_AMBIENT: Vec3 = Vec3::ONE;

/// Point light source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
}

impl PointLight {
    pub const fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }

    /// Read a JSON light list: `[{"position": [x, y, z], "color": [r, g, b]}, ...]`.
    #[tracing::instrument]
    pub fn load_list(path: &Path) -> Result<Vec<Self>> {
        if !path.exists() {
            return Err(crate::Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let lights: Vec<Self> = serde_json::from_str(&text)?;
        tracing::info!("Loaded {} point lights from {}", lights.len(), path.display());
        Ok(lights)
    }
}

/// Identity of a hit object: mesh index plus object index inside that mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub mesh: usize,
    pub object: usize,
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mesh, self.object)
    }
}

/// Renderable world.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    point_lights: Vec<PointLight>,
    configured_ambient: Option<Vec3>,
    skybox: Skybox,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    // Setup

    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    pub fn set_point_lights(&mut self, lights: Vec<PointLight>) {
        self.point_lights = lights;
    }

    /// Ambient colour used once the scene has at least one point light.
    pub fn set_ambient(&mut self, ambient: Vec3) {
        self.configured_ambient = Some(ambient);
    }

    pub fn set_skybox(&mut self, skybox: Skybox) {
        self.skybox = skybox;
    }

    // Read access

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    /// Effective ambient term: [`DEFAULT_AMBIENT`] without point lights,
    /// the configured colour (or the default if none was set) otherwise.
    pub fn ambient_light(&self) -> Vec3 {
        if self.point_lights.is_empty() {
            DEFAULT_AMBIENT
        } else {
            self.configured_ambient.unwrap_or(DEFAULT_AMBIENT)
        }
    }

    pub fn skybox(&self) -> &Skybox {
        &self.skybox
    }

    /// Union of all mesh bounds (empty for a scene without geometry).
    pub fn bounds(&self) -> BBox3f {
        self.meshes.iter().fold(BBox3f::EMPTY, |mut b, m| {
            b.expand_by_box(&m.bounds());
            b
        })
    }

    pub fn object(&self, id: ObjectId) -> Option<&MeshObject> {
        self.meshes.get(id.mesh)?.objects().get(id.object)
    }

    pub fn object_name(&self, id: ObjectId) -> Option<&str> {
        self.object(id).map(|o| o.name.as_str())
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles().len()).sum()
    }
}
