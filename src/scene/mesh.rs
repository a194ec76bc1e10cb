//! Triangle meshes, per-object materials and OBJ import.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::util::{BBox3f, Error, Ray, Result, Vec2, Vec3};

use super::build::build_bvh;
use super::bvh::{Bvh, Triangle, TriangleHit};
use super::texture::{ImageTexture, Texture};

/// Diffuse surface description.
#[derive(Clone)]
pub struct Material {
    pub diffuse: Vec3,
    pub texture: Option<Arc<dyn Texture>>,
}

impl Material {
    pub fn diffuse(color: Vec3) -> Self {
        Self {
            diffuse: color,
            texture: None,
        }
    }

    /// Surface colour at an optional texture coordinate.
    pub fn albedo(&self, uv: Option<Vec2>) -> Vec3 {
        match (&self.texture, uv) {
            (Some(texture), Some(uv)) => self.diffuse * texture.sample(uv),
            _ => self.diffuse,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Vec3::splat(0.8))
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("diffuse", &self.diffuse)
            .field("textured", &self.texture.is_some())
            .finish()
    }
}

/// Named part of a mesh with its own material.
#[derive(Debug, Clone)]
pub struct MeshObject {
    pub name: String,
    pub material: Material,
}

/// Nearest triangle hit inside one mesh.
#[derive(Debug, Clone, Copy)]
pub struct MeshHit {
    pub triangle: usize,
    pub hit: TriangleHit,
}

/// Renderable geometry with its acceleration structure.
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    objects: Vec<MeshObject>,
    triangles: Vec<Triangle>,
    bvh: Bvh,
    bounds: BBox3f,
}

impl Mesh {
    /// Build a mesh. Every triangle's `object` must index into `objects`.
    pub fn new(name: impl Into<String>, objects: Vec<MeshObject>, triangles: Vec<Triangle>) -> Result<Self> {
        let name = name.into();
        if let Some(tri) = triangles.iter().find(|t| t.object as usize >= objects.len()) {
            return Err(Error::other(format!(
                "mesh {name}: triangle references object {} of {}",
                tri.object,
                objects.len()
            )));
        }

        let bounds = triangles.iter().fold(BBox3f::EMPTY, |mut b, t| {
            b.expand_by_box(&t.aabb());
            b
        });
        let bvh = build_bvh(&triangles);
        tracing::debug!(%name, objects = objects.len(), triangles = triangles.len(), nodes = bvh.nodes.len(), "mesh ready");

        Ok(Self {
            name,
            objects,
            triangles,
            bvh,
            bounds,
        })
    }

    /// Import a Wavefront OBJ file (with optional MTL) through `tobj`.
    #[tracing::instrument]
    pub fn load_obj(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let mesh_err = |message: String| Error::MeshLoad {
            path: path.to_path_buf(),
            message,
        };

        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, materials) = tobj::load_obj(path, &options).map_err(|e| mesh_err(e.to_string()))?;
        let materials = materials.unwrap_or_else(|e| {
            tracing::warn!("{}: no usable materials ({e}), using defaults", path.display());
            Vec::new()
        });

        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let resolved: Vec<Material> = materials.iter().map(|m| convert_material(m, &base_dir)).collect();

        let mut objects = Vec::with_capacity(models.len());
        let mut triangles = Vec::new();
        for (object_idx, model) in models.iter().enumerate() {
            let material = model
                .mesh
                .material_id
                .and_then(|id| resolved.get(id).cloned())
                .unwrap_or_default();
            objects.push(MeshObject {
                name: model.name.clone(),
                material,
            });
            append_triangles(&model.mesh, object_idx as u32, &mut triangles)
                .map_err(|msg| mesh_err(format!("{}: {msg}", model.name)))?;
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mesh".to_string());
        tracing::info!("Loaded {}: {} objects, {} triangles", path.display(), objects.len(), triangles.len());
        Self::new(name, objects, triangles)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objects(&self) -> &[MeshObject] {
        &self.objects
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn bounds(&self) -> BBox3f {
        self.bounds
    }

    /// Lower corner of the axis-aligned bounds.
    pub fn lower_bound(&self) -> Vec3 {
        self.bounds.min
    }

    /// Upper corner of the axis-aligned bounds.
    pub fn upper_bound(&self) -> Vec3 {
        self.bounds.max
    }

    pub fn intersect(&self, ray: &Ray, t_max: f32) -> Option<MeshHit> {
        self.bvh
            .intersect(&self.triangles, ray, t_max)
            .map(|(triangle, hit)| MeshHit { triangle, hit })
    }

    pub fn occluded(&self, ray: &Ray, t_max: f32) -> bool {
        self.bvh.occluded(&self.triangles, ray, t_max)
    }
}

fn convert_material(m: &tobj::Material, base_dir: &Path) -> Material {
    let diffuse = m.diffuse.map(Vec3::from).unwrap_or(Vec3::splat(0.8));
    let texture = m.diffuse_texture.as_ref().and_then(|file| {
        let tex_path: PathBuf = base_dir.join(file);
        match ImageTexture::open(&tex_path) {
            Ok(tex) => Some(Arc::new(tex) as Arc<dyn Texture>),
            Err(e) => {
                tracing::warn!("material {}: {e}, falling back to diffuse colour", m.name);
                None
            }
        }
    });
    Material { diffuse, texture }
}

fn append_triangles(mesh: &tobj::Mesh, object: u32, out: &mut Vec<Triangle>) -> std::result::Result<(), String> {
    let vertex_count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() / 3 == vertex_count;
    let has_uvs = mesh.texcoords.len() / 2 == vertex_count;

    let position = |i: usize| Vec3::from_slice(&mesh.positions[3 * i..3 * i + 3]);
    let normal = |i: usize| Vec3::from_slice(&mesh.normals[3 * i..3 * i + 3]);
    let uv = |i: usize| Vec2::from_slice(&mesh.texcoords[2 * i..2 * i + 2]);

    for face in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [face[0] as usize, face[1] as usize, face[2] as usize];
        if a.max(b).max(c) >= vertex_count {
            return Err(format!("index out of range ({vertex_count} vertices)"));
        }
        out.push(Triangle {
            v0: position(a),
            v1: position(b),
            v2: position(c),
            normals: has_normals.then(|| [normal(a), normal(b), normal(c)]),
            uvs: has_uvs.then(|| [uv(a), uv(b), uv(c)]),
            object,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> Mesh {
        let objects = vec![MeshObject {
            name: "quad".into(),
            material: Material::default(),
        }];
        let triangles = vec![
            Triangle::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0), 0),
            Triangle::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0),
        ];
        Mesh::new("quad", objects, triangles).unwrap()
    }

    #[test]
    fn test_bounds() {
        let mesh = quad_mesh();
        assert_eq!(mesh.lower_bound(), Vec3::ZERO);
        assert_eq!(mesh.upper_bound(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_rejects_bad_object_index() {
        let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, 3);
        assert!(Mesh::new("broken", Vec::new(), vec![tri]).is_err());
    }

    #[test]
    fn test_intersect() {
        let mesh = quad_mesh();
        let ray = Ray::new(Vec3::new(0.25, 0.75, -1.0), Vec3::Z).unwrap();
        let hit = mesh.intersect(&ray, f32::INFINITY).expect("should hit");
        assert_eq!(hit.triangle, 1);
        assert!((hit.hit.t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_material_albedo_without_uv() {
        let m = Material::diffuse(Vec3::new(0.5, 0.25, 1.0));
        assert_eq!(m.albedo(None), Vec3::new(0.5, 0.25, 1.0));
        assert_eq!(m.albedo(Some(Vec2::ZERO)), Vec3::new(0.5, 0.25, 1.0));
    }

    #[test]
    fn test_load_missing_obj() {
        let err = Mesh::load_obj(Path::new("missing/cornell_box.obj")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
