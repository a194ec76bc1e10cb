//! BVH node and triangle types, plus CPU traversal.
//!
//! Flat array layout:
//! - Internal node: `left_or_first` = left child index, `count` = 0,
//!   right child is always `left_or_first + 1`
//! - Leaf node: `left_or_first` = first entry in `tri_indices`, `count` > 0

use smallvec::SmallVec;

use crate::util::{BBox3f, Ray, Vec2, Vec3};

/// Rays closer to parallel than this are treated as misses.
const PARALLEL_EPSILON: f32 = 1e-8;

/// Flat BVH node.
#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    pub bounds: BBox3f,
    pub left_or_first: u32,
    pub count: u32,
}

impl BvhNode {
    pub const EMPTY: Self = Self {
        bounds: BBox3f::EMPTY,
        left_or_first: 0,
        count: 0,
    };

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// Triangle with optional shading attributes.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub normals: Option<[Vec3; 3]>,
    pub uvs: Option<[Vec2; 3]>,
    /// Index of the owning object within its mesh.
    pub object: u32,
}

/// Ray/triangle hit in barycentric form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

impl Triangle {
    /// Flat triangle without shading attributes.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, object: u32) -> Self {
        Self {
            v0,
            v1,
            v2,
            normals: None,
            uvs: None,
            object,
        }
    }

    /// Two triangles covering the planar quad `a b c d` (counter-clockwise).
    pub fn quad([a, b, c, d]: [Vec3; 4], object: u32) -> [Self; 2] {
        [Self::new(a, b, c, object), Self::new(a, c, d, object)]
    }

    /// Compute AABB of this triangle.
    pub fn aabb(&self) -> BBox3f {
        let mut b = BBox3f::EMPTY;
        b.expand_by_point(self.v0);
        b.expand_by_point(self.v1);
        b.expand_by_point(self.v2);
        b
    }

    /// Centroid of the triangle.
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Unnormalized geometric normal (winding order v0, v1, v2).
    pub fn face_normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(self.v2 - self.v0)
    }

    /// Möller-Trumbore intersection. Only strictly positive distances below
    /// `t_max` count as hits.
    pub fn intersect(&self, ray: &Ray, t_max: f32) -> Option<TriangleHit> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);
        if a.abs() < PARALLEL_EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        (t > 0.0 && t < t_max).then_some(TriangleHit { t, u, v })
    }

    /// Shading normal at barycentric `(u, v)`; falls back to the face normal.
    pub fn normal_at(&self, u: f32, v: f32) -> Vec3 {
        let face = self.face_normal().normalize_or_zero();
        match self.normals {
            Some([n0, n1, n2]) => (n0 * (1.0 - u - v) + n1 * u + n2 * v)
                .try_normalize()
                .unwrap_or(face),
            None => face,
        }
    }

    /// Interpolated texture coordinate, if the triangle has any.
    pub fn uv_at(&self, u: f32, v: f32) -> Option<Vec2> {
        self.uvs
            .map(|[t0, t1, t2]| t0 * (1.0 - u - v) + t1 * u + t2 * v)
    }
}

/// Built BVH.
#[derive(Debug, Clone)]
pub struct Bvh {
    /// Flat node array (index 0 = root).
    pub nodes: Vec<BvhNode>,
    /// Reordered triangle indices (leaves reference into this).
    pub tri_indices: Vec<usize>,
}

impl Bvh {
    /// Nearest hit along `ray` closer than `t_max`.
    ///
    /// Returns the triangle index and hit. Equal distances keep the triangle
    /// visited first, so repeated queries are deterministic.
    pub fn intersect(&self, triangles: &[Triangle], ray: &Ray, t_max: f32) -> Option<(usize, TriangleHit)> {
        let mut best = None;
        self.walk(ray, t_max, |tri_idx, closest| {
            if let Some(hit) = triangles[tri_idx].intersect(ray, *closest) {
                *closest = hit.t;
                best = Some((tri_idx, hit));
            }
            false
        });
        best
    }

    /// True if anything lies on `ray` strictly between 0 and `t_max`.
    pub fn occluded(&self, triangles: &[Triangle], ray: &Ray, t_max: f32) -> bool {
        let mut found = false;
        self.walk(ray, t_max, |tri_idx, limit| {
            found = triangles[tri_idx].intersect(ray, *limit).is_some();
            found
        });
        found
    }

    /// Depth-first traversal. `visit` may shrink the search distance and
    /// returns true to stop early.
    fn walk<V>(&self, ray: &Ray, t_max: f32, mut visit: V)
    where
        V: FnMut(usize, &mut f32) -> bool,
    {
        if self.tri_indices.is_empty() {
            return;
        }

        let mut limit = t_max;
        let mut stack: SmallVec<[usize; 64]> = SmallVec::new();
        stack.push(0);
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if node.bounds.hit(ray, limit).is_none() {
                continue;
            }

            if node.is_leaf() {
                let first = node.left_or_first as usize;
                for &tri_idx in &self.tri_indices[first..first + node.count as usize] {
                    if visit(tri_idx, &mut limit) {
                        return;
                    }
                }
            } else {
                let left = node.left_or_first as usize;
                stack.push(left + 1);
                stack.push(left);
            }
        }
    }
}
