//! Built-in Cornell box, used when no scene file is configured.

use crate::util::{Result, Vec3};

use super::bvh::Triangle;
use super::mesh::{Material, Mesh, MeshObject};
use super::PointLight;

const WIDTH: f32 = 556.0;
const HEIGHT: f32 = 548.8;
const DEPTH: f32 = 559.2;

/// Ceiling light of the classic setup.
pub const CORNELL_LIGHT: PointLight = PointLight::new(Vec3::new(278.0, 448.0, 279.5), Vec3::new(0.7, 0.7, 0.7));

/// Six faces of an axis-aligned box.
pub fn box_faces(min: Vec3, max: Vec3, object: u32) -> Vec<Triangle> {
    let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
    let (a, b) = (min, max);
    let faces = [
        [p(a.x, a.y, a.z), p(b.x, a.y, a.z), p(b.x, b.y, a.z), p(a.x, b.y, a.z)],
        [p(a.x, a.y, b.z), p(a.x, b.y, b.z), p(b.x, b.y, b.z), p(b.x, a.y, b.z)],
        [p(a.x, a.y, a.z), p(a.x, b.y, a.z), p(a.x, b.y, b.z), p(a.x, a.y, b.z)],
        [p(b.x, a.y, a.z), p(b.x, a.y, b.z), p(b.x, b.y, b.z), p(b.x, b.y, a.z)],
        [p(a.x, a.y, a.z), p(a.x, a.y, b.z), p(b.x, a.y, b.z), p(b.x, a.y, a.z)],
        [p(a.x, b.y, a.z), p(b.x, b.y, a.z), p(b.x, b.y, b.z), p(a.x, b.y, b.z)],
    ];
    faces.into_iter().flat_map(|f| Triangle::quad(f, object)).collect()
}

/// Open-front Cornell box facing -Z, with two blocks.
pub fn cornell_box() -> Result<Mesh> {
    let white = Material::diffuse(Vec3::new(0.73, 0.73, 0.73));
    let red = Material::diffuse(Vec3::new(0.65, 0.05, 0.05));
    let green = Material::diffuse(Vec3::new(0.12, 0.45, 0.15));

    let parts: [(&str, Material, [Vec3; 4]); 5] = [
        (
            "floor",
            white.clone(),
            [Vec3::ZERO, Vec3::new(0.0, 0.0, DEPTH), Vec3::new(WIDTH, 0.0, DEPTH), Vec3::new(WIDTH, 0.0, 0.0)],
        ),
        (
            "ceiling",
            white.clone(),
            [
                Vec3::new(0.0, HEIGHT, 0.0),
                Vec3::new(WIDTH, HEIGHT, 0.0),
                Vec3::new(WIDTH, HEIGHT, DEPTH),
                Vec3::new(0.0, HEIGHT, DEPTH),
            ],
        ),
        (
            "back_wall",
            white.clone(),
            [
                Vec3::new(0.0, 0.0, DEPTH),
                Vec3::new(0.0, HEIGHT, DEPTH),
                Vec3::new(WIDTH, HEIGHT, DEPTH),
                Vec3::new(WIDTH, 0.0, DEPTH),
            ],
        ),
        (
            "left_wall",
            red,
            [
                Vec3::new(WIDTH, 0.0, 0.0),
                Vec3::new(WIDTH, 0.0, DEPTH),
                Vec3::new(WIDTH, HEIGHT, DEPTH),
                Vec3::new(WIDTH, HEIGHT, 0.0),
            ],
        ),
        (
            "right_wall",
            green,
            [Vec3::ZERO, Vec3::new(0.0, HEIGHT, 0.0), Vec3::new(0.0, HEIGHT, DEPTH), Vec3::new(0.0, 0.0, DEPTH)],
        ),
    ];

    let mut objects = Vec::new();
    let mut triangles = Vec::new();
    for (name, material, corners) in parts {
        triangles.extend(Triangle::quad(corners, objects.len() as u32));
        objects.push(MeshObject {
            name: name.to_string(),
            material,
        });
    }

    for (name, min, max) in [
        ("short_block", Vec3::new(130.0, 0.0, 65.0), Vec3::new(290.0, 165.0, 225.0)),
        ("tall_block", Vec3::new(265.0, 0.0, 295.0), Vec3::new(430.0, 330.0, 460.0)),
    ] {
        triangles.extend(box_faces(min, max, objects.len() as u32));
        objects.push(MeshObject {
            name: name.to_string(),
            material: white.clone(),
        });
    }

    Mesh::new("cornell_box", objects, triangles)
}
