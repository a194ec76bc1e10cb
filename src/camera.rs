//! Camera manager shared by the preview and the ray tracer.
//!
//! Two modes, picked once at construction:
//! - static: a fixed viewpoint, identical on every query (batch captures)
//! - interactive: a dolly fly rig driven by per-frame input

use dolly::prelude::*;
use glam::{Mat4, Vec2, Vec3};

use crate::util::{BBox3f, Ray, Result};

/// Reference viewpoint for the static camera at scale 1.
const STATIC_EYE: Vec3 = Vec3::new(278.0, 273.0, -800.0);
const STATIC_TARGET: Vec3 = Vec3::new(278.0, 273.0, 0.0);

/// Degrees of rotation per pixel of pointer motion.
const LOOK_SENSITIVITY: f32 = 0.2;

/// Perspective parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lens {
    /// Vertical FOV in degrees
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Lens {
    pub fn new(aspect: f32) -> Self {
        Self {
            fov_y: 39.3,
            aspect,
            near: 1.0,
            far: 10_000.0,
        }
    }

    /// Clip ranges proportional to `scale` for scenes of any size.
    pub fn scaled(aspect: f32, scale: f32) -> Self {
        let scale = scale.max(f32::EPSILON);
        Self {
            near: scale,
            far: 10_000.0 * scale,
            ..Self::new(aspect)
        }
    }

    /// OpenGL-convention projection (clip z in `[-w, w]`).
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y.to_radians(), self.aspect, self.near, self.far)
    }
}

/// Snapshot of the camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub mvp: Mat4,
}

impl CameraState {
    /// World-space ray from the camera through normalized device coordinate
    /// `ndc` (`[-1, 1]`, +y up), reconstructed via the inverse transform.
    pub fn ray_through(&self, ndc: Vec2) -> Result<Ray> {
        ray_through(self.position, &self.mvp.inverse(), ndc)
    }

    /// Ray along the view-forward direction (screen centre).
    pub fn forward_ray(&self) -> Result<Ray> {
        self.ray_through(Vec2::ZERO)
    }
}

/// Ray through `ndc` given an already inverted view-projection.
pub fn ray_through(position: Vec3, inv_mvp: &Mat4, ndc: Vec2) -> Result<Ray> {
    let far_point = inv_mvp.project_point3(ndc.extend(1.0));
    Ray::new(position, far_point - position)
}

/// Input gathered by the preview during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Pointer motion in pixels (+x right, +y down).
    pub look: Vec2,
    /// Movement in camera space, in steps: x right, y up, z forward.
    pub movement: Vec3,
}

impl FrameInput {
    pub fn is_idle(&self) -> bool {
        self.look == Vec2::ZERO && self.movement == Vec3::ZERO
    }
}

/// Fixed viewpoint.
#[derive(Debug, Clone, Copy)]
pub struct StaticCamera {
    eye: Vec3,
    target: Vec3,
    lens: Lens,
}

impl StaticCamera {
    fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }
}

/// Fly camera: position plus yaw/pitch.
pub struct FlyCamera {
    rig: CameraRig,
    /// World units per movement step
    step: f32,
    lens: Lens,
}

impl FlyCamera {
    pub fn new(eye: Vec3, target: Vec3, step: f32, lens: Lens) -> Self {
        let dir = (target - eye).try_normalize().unwrap_or(Vec3::NEG_Z);
        // dolly looks down -Z at zero yaw/pitch
        let yaw = (-dir.x).atan2(-dir.z).to_degrees();
        let pitch = dir.y.clamp(-1.0, 1.0).asin().to_degrees();

        let mut rig = CameraRig::builder()
            .with(Position::new(mint::Point3 { x: eye.x, y: eye.y, z: eye.z }))
            .with(YawPitch::new().yaw_degrees(yaw).pitch_degrees(pitch))
            .build();
        rig.update(0.0);

        Self { rig, step, lens }
    }

    /// Apply one frame of input.
    pub fn apply(&mut self, input: &FrameInput, dt: f32) {
        if input.look != Vec2::ZERO {
            self.rig.driver_mut::<YawPitch>().rotate_yaw_pitch(
                -input.look.x * LOOK_SENSITIVITY,
                -input.look.y * LOOK_SENSITIVITY,
            );
        }

        if input.movement != Vec3::ZERO {
            let t = &self.rig.final_transform;
            let right: Vec3 = t.right();
            let up: Vec3 = t.up();
            let forward: Vec3 = t.forward();
            let delta =
                (right * input.movement.x + up * input.movement.y + forward * input.movement.z) * self.step;
            self.rig
                .driver_mut::<Position>()
                .translate(mint::Vector3 { x: delta.x, y: delta.y, z: delta.z });
        }

        self.rig.update(dt);
    }

    pub fn position(&self) -> Vec3 {
        let p = self.rig.final_transform.position;
        Vec3::new(p.x, p.y, p.z)
    }

    fn view(&self) -> Mat4 {
        let t = &self.rig.final_transform;
        let pos = self.position();
        let fwd: Vec3 = t.forward();
        let up: Vec3 = t.up();
        Mat4::look_at_rh(pos, pos + fwd, up)
    }
}

enum CameraMode {
    Static(StaticCamera),
    Interactive(FlyCamera),
}

/// Camera position and view-projection provider.
///
/// Nothing is cached: every query recomputes from the current mode state,
/// which only changes inside [`CameraManager::apply_input`].
pub struct CameraManager {
    mode: CameraMode,
}

impl CameraManager {
    /// Static camera at the reference viewpoint scaled by `scale`.
    pub fn fixed(scale: f32, aspect: f32) -> Self {
        Self {
            mode: CameraMode::Static(StaticCamera {
                eye: STATIC_EYE * scale,
                target: STATIC_TARGET * scale,
                lens: Lens::scaled(aspect, scale),
            }),
        }
    }

    /// Static camera framing `bounds` from the -Z side.
    pub fn framing(bounds: &BBox3f, aspect: f32) -> Self {
        if bounds.is_empty() {
            return Self::fixed(1.0, aspect);
        }
        let lens = Lens::new(aspect);
        let radius = (bounds.size().length() * 0.5).max(f32::EPSILON);
        let half_fov = (lens.fov_y.to_radians() * 0.5).min((lens.fov_y.to_radians() * 0.5 * aspect).atan());
        let distance = radius / half_fov.tan() * 1.1;
        let target = bounds.center();
        Self {
            mode: CameraMode::Static(StaticCamera {
                eye: target - Vec3::Z * distance,
                target,
                lens: Lens {
                    near: distance * 0.01,
                    far: (distance + radius) * 4.0,
                    ..lens
                },
            }),
        }
    }

    /// Interactive fly camera starting at `eye` looking at `target`.
    /// `scale` sets the movement step and clip ranges.
    pub fn interactive(eye: Vec3, target: Vec3, scale: f32, aspect: f32) -> Self {
        Self {
            mode: CameraMode::Interactive(FlyCamera::new(eye, target, scale, Lens::scaled(aspect, scale))),
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self.mode, CameraMode::Interactive(_))
    }

    /// Feed one frame of input. Static cameras ignore it.
    pub fn apply_input(&mut self, input: &FrameInput, dt: f32) {
        if let CameraMode::Interactive(cam) = &mut self.mode {
            cam.apply(input, dt);
        }
    }

    pub fn camera_pos(&self) -> Vec3 {
        match &self.mode {
            CameraMode::Static(cam) => cam.eye,
            CameraMode::Interactive(cam) => cam.position(),
        }
    }

    /// Combined view-projection transform.
    pub fn mvp(&self) -> Mat4 {
        match &self.mode {
            CameraMode::Static(cam) => cam.lens.projection() * cam.view(),
            CameraMode::Interactive(cam) => cam.lens.projection() * cam.view(),
        }
    }

    /// View-projection for a target with a different aspect ratio than the
    /// one the camera was built with.
    pub fn mvp_for_aspect(&self, aspect: f32) -> Mat4 {
        match &self.mode {
            CameraMode::Static(cam) => Lens { aspect, ..cam.lens }.projection() * cam.view(),
            CameraMode::Interactive(cam) => Lens { aspect, ..cam.lens }.projection() * cam.view(),
        }
    }

    pub fn state(&self) -> CameraState {
        CameraState {
            position: self.camera_pos(),
            mvp: self.mvp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-3, "{a:?} != {b:?}");
    }

    #[test]
    fn test_static_is_deterministic() {
        let cam = CameraManager::fixed(1.0, 4.0 / 3.0);
        assert_eq!(cam.mvp(), cam.mvp());
        assert_eq!(cam.camera_pos(), Vec3::new(278.0, 273.0, -800.0));
    }

    #[test]
    fn test_static_ignores_input() {
        let mut cam = CameraManager::fixed(2.0, 1.0);
        let before = cam.state();
        cam.apply_input(&FrameInput { look: Vec2::new(10.0, 5.0), movement: Vec3::Z }, 0.016);
        assert_eq!(cam.state(), before);
        assert!(!cam.is_interactive());
    }

    #[test]
    fn test_forward_ray_points_at_target() {
        let cam = CameraManager::fixed(1.0, 1.0);
        let ray = cam.state().forward_ray().unwrap();
        assert_vec_close(ray.origin, Vec3::new(278.0, 273.0, -800.0));
        assert_vec_close(ray.direction, Vec3::Z);
    }

    #[test]
    fn test_ray_through_corner_diverges() {
        let state = CameraManager::fixed(1.0, 1.0).state();
        let ray = state.ray_through(Vec2::new(1.0, 1.0)).unwrap();
        // Looking down +Z, screen right is world -X
        assert!(ray.direction.x < 0.0 && ray.direction.y > 0.0 && ray.direction.z > 0.0);
    }

    #[test]
    fn test_interactive_initial_orientation() {
        let cam = CameraManager::interactive(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO, 1.0, 1.0);
        assert!(cam.is_interactive());
        assert_vec_close(cam.camera_pos(), Vec3::new(0.0, 0.0, -10.0));
        assert_vec_close(cam.state().forward_ray().unwrap().direction, Vec3::Z);
    }

    #[test]
    fn test_interactive_stable_within_frame() {
        let mut cam = CameraManager::interactive(Vec3::ZERO, Vec3::NEG_Z, 1.0, 1.0);
        cam.apply_input(&FrameInput { look: Vec2::new(3.0, 0.0), movement: Vec3::ZERO }, 0.016);
        let a = cam.state();
        let b = cam.state();
        assert_eq!(a, b);
    }

    #[test]
    fn test_interactive_moves_forward() {
        let mut cam = CameraManager::interactive(Vec3::ZERO, Vec3::NEG_Z, 2.5, 1.0);
        cam.apply_input(&FrameInput { look: Vec2::ZERO, movement: Vec3::Z }, 0.016);
        assert_vec_close(cam.camera_pos(), Vec3::new(0.0, 0.0, -2.5));
    }

    #[test]
    fn test_framing_contains_bounds_in_view() {
        let bounds = BBox3f::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let cam = CameraManager::framing(&bounds, 1.0);
        let clip = cam.mvp() * bounds.max.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
        assert!(cam.camera_pos().z < -1.0);
    }

    #[test]
    fn test_mvp_for_aspect_keeps_pose() {
        let cam = CameraManager::fixed(1.0, 1.0);
        assert_eq!(cam.mvp_for_aspect(1.0), cam.mvp());

        // Same forward ray, wider frustum horizontally
        let wide = CameraState { position: cam.camera_pos(), mvp: cam.mvp_for_aspect(2.0) };
        assert_vec_close(wide.forward_ray().unwrap().direction, cam.state().forward_ray().unwrap().direction);
        let edge = |state: CameraState| state.ray_through(Vec2::new(1.0, 0.0)).unwrap().direction.x.abs();
        assert!(edge(wide) > edge(cam.state()));
    }
}
