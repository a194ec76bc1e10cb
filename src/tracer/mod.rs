//! CPU ray tracer.
//!
//! Finds the nearest surface along a ray and shades it with the ambient
//! term plus every point light that has a clear line of sight:
//!
//! ```text
//! color = albedo * (ambient + sum(light.color * max(0, n . l)))   for visible lights
//! color = skybox(direction)                                       on a miss
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crate::scene::{ObjectId, Scene};
use crate::util::{Ray, Result, Vec2, Vec3};

/// Relative offset applied to shadow ray origins to avoid self-hits.
const SHADOW_BIAS: f32 = 1e-4;

/// Nearest surface hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub object: ObjectId,
    pub t: f32,
    pub point: Vec3,
    /// Unit shading normal, flipped to face the incoming ray.
    pub normal: Vec3,
    pub uv: Option<Vec2>,
}

/// Ray counters, summed over all threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracerStats {
    pub primary_rays: u64,
    pub shadow_rays: u64,
}

/// Ray tracer. Holds no scene state; every query takes the scene it runs on.
#[derive(Debug, Default)]
pub struct PathTracer {
    primary_rays: AtomicU64,
    shadow_rays: AtomicU64,
}

impl PathTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colour seen from `origin` along `direction` (normalized here).
    pub fn trace(&self, origin: Vec3, direction: Vec3, scene: &Scene) -> Result<Vec3> {
        let ray = Ray::new(origin, direction)?;
        Ok(self.trace_ray(&ray, scene))
    }

    /// Which object, if any, is nearest along the ray. Uses the same search
    /// as [`PathTracer::trace`], so both always agree on the hit.
    pub fn debug_trace(&self, origin: Vec3, direction: Vec3, scene: &Scene) -> Result<Option<ObjectId>> {
        let ray = Ray::new(origin, direction)?;
        let hit = self.intersect(&ray, scene);
        tracing::debug!(?hit, "debug trace");
        Ok(hit.map(|h| h.object))
    }

    /// Colour for an already validated ray.
    pub fn trace_ray(&self, ray: &Ray, scene: &Scene) -> Vec3 {
        self.primary_rays.fetch_add(1, Ordering::Relaxed);
        match self.intersect(ray, scene) {
            Some(hit) => self.shade(&hit, scene),
            None => scene.skybox().sample(ray.direction),
        }
    }

    /// Nearest hit with strictly positive distance. Ties keep the mesh that
    /// comes first in the scene.
    pub fn intersect(&self, ray: &Ray, scene: &Scene) -> Option<Hit> {
        let mut closest = f32::INFINITY;
        let mut best = None;
        for (mesh_idx, mesh) in scene.meshes().iter().enumerate() {
            if let Some(mesh_hit) = mesh.intersect(ray, closest) {
                closest = mesh_hit.hit.t;
                best = Some((mesh_idx, mesh_hit));
            }
        }

        let (mesh_idx, mesh_hit) = best?;
        let tri = &scene.meshes()[mesh_idx].triangles()[mesh_hit.triangle];
        let (u, v) = (mesh_hit.hit.u, mesh_hit.hit.v);
        let mut normal = tri.normal_at(u, v);
        if normal.dot(ray.direction) > 0.0 {
            normal = -normal;
        }

        Some(Hit {
            object: ObjectId {
                mesh: mesh_idx,
                object: tri.object as usize,
            },
            t: mesh_hit.hit.t,
            point: ray.at(mesh_hit.hit.t),
            normal,
            uv: tri.uv_at(u, v),
        })
    }

    fn shade(&self, hit: &Hit, scene: &Scene) -> Vec3 {
        let albedo = scene
            .object(hit.object)
            .map(|o| o.material.albedo(hit.uv))
            .unwrap_or(Vec3::ZERO);

        let mut irradiance = scene.ambient_light();
        for light in scene.point_lights() {
            let to_light = light.position - hit.point;
            let Some(l) = to_light.try_normalize() else {
                continue;
            };
            let alignment = hit.normal.dot(l);
            if alignment <= 0.0 {
                continue;
            }
            if self.light_visible(hit, light.position, scene) {
                irradiance += light.color * alignment;
            }
        }

        albedo * irradiance
    }

    /// True when nothing lies strictly between the hit point and `light_pos`.
    fn light_visible(&self, hit: &Hit, light_pos: Vec3, scene: &Scene) -> bool {
        self.shadow_rays.fetch_add(1, Ordering::Relaxed);
        let bias = SHADOW_BIAS * (1.0 + hit.point.abs().max_element());
        let origin = hit.point + hit.normal * bias;
        let to_light = light_pos - origin;
        let distance = to_light.length();
        let Ok(ray) = Ray::new(origin, to_light) else {
            return true;
        };
        let t_max = distance * (1.0 - SHADOW_BIAS);
        !scene.meshes().iter().any(|mesh| mesh.occluded(&ray, t_max))
    }

    pub fn stats(&self) -> TracerStats {
        TracerStats {
            primary_rays: self.primary_rays.load(Ordering::Relaxed),
            shadow_rays: self.shadow_rays.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.primary_rays.store(0, Ordering::Relaxed);
        self.shadow_rays.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, Mesh, MeshObject, PointLight, Skybox, Triangle};
    use crate::Error;

    const SKY: Vec3 = Vec3::new(0.1, 0.2, 0.3);

    /// Square in the plane `y = height`, centred on the origin.
    fn horizontal(height: f32, half: f32, object: u32) -> [Triangle; 2] {
        Triangle::quad(
            [
                Vec3::new(-half, height, -half),
                Vec3::new(-half, height, half),
                Vec3::new(half, height, half),
                Vec3::new(half, height, -half),
            ],
            object,
        )
    }

    /// Floor at y=0 (object 0, white) and a smaller plate at y=1 (object 1, red).
    fn floor_and_plate() -> Scene {
        let objects = vec![
            MeshObject { name: "floor".into(), material: Material::diffuse(Vec3::ONE) },
            MeshObject { name: "plate".into(), material: Material::diffuse(Vec3::X) },
        ];
        let mut triangles = horizontal(0.0, 10.0, 0).to_vec();
        triangles.extend(horizontal(1.0, 1.0, 1));
        let mut scene = Scene::new();
        scene.add_mesh(Mesh::new("test", objects, triangles).unwrap());
        scene.set_skybox(Skybox::Solid(SKY));
        scene
    }

    #[test]
    fn test_empty_scene_returns_skybox() {
        let mut scene = Scene::new();
        scene.set_skybox(Skybox::Gradient { horizon: Vec3::ZERO, zenith: Vec3::ONE });
        let tracer = PathTracer::new();
        let color = tracer.trace(Vec3::ZERO, Vec3::new(0.0, 1.0, 1.0), &scene).unwrap();
        assert_eq!(color, scene.skybox().sample(Vec3::new(0.0, 1.0, 1.0).normalize()));
    }

    #[test]
    fn test_debug_trace_agrees_with_trace() {
        let scene = floor_and_plate();
        let tracer = PathTracer::new();
        // Off the quad diagonals so the hit is unambiguous
        let origin = Vec3::new(0.2, 5.0, -0.4);

        // Straight down hits the plate first
        assert_eq!(
            tracer.debug_trace(origin, -Vec3::Y, &scene).unwrap(),
            Some(ObjectId { mesh: 0, object: 1 })
        );
        // No lights: ambient is 1, so the colour is the plate's albedo
        assert_eq!(tracer.trace(origin, -Vec3::Y, &scene).unwrap(), Vec3::X);

        // Beside the plate the floor is hit
        let side = Vec3::new(5.0, 5.0, 0.0);
        assert_eq!(
            tracer.debug_trace(side, -Vec3::Y, &scene).unwrap(),
            Some(ObjectId { mesh: 0, object: 0 })
        );
        assert_eq!(tracer.trace(side, -Vec3::Y, &scene).unwrap(), Vec3::ONE);
    }

    #[test]
    fn test_miss_reports_none() {
        let scene = floor_and_plate();
        let tracer = PathTracer::new();
        assert_eq!(tracer.debug_trace(Vec3::new(0.0, 5.0, 0.0), Vec3::Y, &scene).unwrap(), None);
    }

    #[test]
    fn test_occluded_light_contributes_nothing() {
        let mut scene = floor_and_plate();
        scene.set_ambient(Vec3::splat(0.1));
        scene.add_point_light(PointLight::new(Vec3::new(0.0, 3.0, 0.0), Vec3::ONE));
        let tracer = PathTracer::new();

        // Under the plate: shadowed, ambient only
        let shadowed = tracer.trace(Vec3::new(0.5, 0.5, 0.0), -Vec3::Y, &scene).unwrap();
        assert_eq!(shadowed, Vec3::splat(0.1));

        // Far from the plate: lit
        let lit = tracer.trace(Vec3::new(5.0, 0.5, 0.0), -Vec3::Y, &scene).unwrap();
        assert!(lit.x > 0.1 && lit.y > 0.1);
    }

    #[test]
    fn test_light_behind_surface_contributes_nothing() {
        let mut scene = floor_and_plate();
        scene.set_ambient(Vec3::splat(0.25));
        // Below the floor, away from the viewer above it
        scene.add_point_light(PointLight::new(Vec3::new(5.0, -3.0, 0.0), Vec3::ONE));
        let tracer = PathTracer::new();
        let color = tracer.trace(Vec3::new(5.0, 2.0, 0.0), -Vec3::Y, &scene).unwrap();
        assert_eq!(color, Vec3::splat(0.25));
    }

    #[test]
    fn test_backdrop_ignores_lights() {
        let mut scene = floor_and_plate();
        scene.set_ambient(Vec3::splat(0.5));
        scene.add_point_light(PointLight::new(Vec3::new(0.0, 3.0, 0.0), Vec3::ONE));
        let tracer = PathTracer::new();
        assert_eq!(tracer.trace(Vec3::new(0.0, 5.0, 0.0), Vec3::Y, &scene).unwrap(), SKY);
    }

    #[test]
    fn test_origin_on_surface_is_not_a_hit() {
        let scene = floor_and_plate();
        let tracer = PathTracer::new();
        // Starting on the plate and looking up: nothing above it
        let hit = tracer.debug_trace(Vec3::new(0.0, 1.0, 0.0), Vec3::Y, &scene).unwrap();
        assert_eq!(hit, None);
    }

    #[test]
    fn test_degenerate_direction_is_error() {
        let scene = floor_and_plate();
        let tracer = PathTracer::new();
        assert!(matches!(tracer.trace(Vec3::ZERO, Vec3::ZERO, &scene), Err(Error::DegenerateRay { .. })));
        assert!(tracer.debug_trace(Vec3::ZERO, Vec3::splat(f32::NAN), &scene).is_err());
    }

    #[test]
    fn test_stats_count_rays() {
        let mut scene = floor_and_plate();
        scene.add_point_light(PointLight::new(Vec3::new(5.0, 3.0, 0.0), Vec3::ONE));
        let tracer = PathTracer::new();
        tracer.trace(Vec3::new(5.0, 2.0, 0.0), -Vec3::Y, &scene).unwrap();
        tracer.trace(Vec3::new(5.0, 2.0, 0.0), Vec3::Y, &scene).unwrap();
        assert_eq!(tracer.stats(), TracerStats { primary_rays: 2, shadow_rays: 1 });
        tracer.reset_stats();
        assert_eq!(tracer.stats(), TracerStats::default());
    }
}
