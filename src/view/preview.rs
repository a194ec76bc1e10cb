//! Interactive preview: rasterized frames plus input handling.

use std::collections::HashSet;
use std::time::Instant;

use glam::{Mat4, Vec3};

use super::action::{Action, ActionQueue};
use super::input::{InputEvent, InputSource, Key};
use super::raster::Framebuffer;
use crate::camera::{CameraManager, CameraState, FrameInput};
use crate::scene::Scene;

/// Real-time view driven by an [`InputSource`].
///
/// Each [`ViewPreview::render`] draws one frame with the camera as it was at
/// the start of the frame, then turns the frame's input into camera motion
/// and queued [`Action`]s.
pub struct ViewPreview {
    camera: CameraManager,
    input: Box<dyn InputSource>,
    actions: ActionQueue,
    framebuffer: Framebuffer,
    held: HashSet<Key>,
    last_frame: Option<Instant>,
    frames: u64,
}

impl ViewPreview {
    pub fn new(camera: CameraManager, input: Box<dyn InputSource>, width: u32, height: u32) -> Self {
        Self {
            camera,
            input,
            actions: ActionQueue::new(),
            framebuffer: Framebuffer::new(width, height),
            held: HashSet::new(),
            last_frame: None,
            frames: 0,
        }
    }

    /// Draw one frame, then process the input that arrived since the last one.
    pub fn render(&mut self, scene: &Scene) {
        let state = self.camera.state();
        let backdrop = scene.skybox().sample(view_forward(&state));
        self.framebuffer.clear(backdrop);
        let drawn = self.framebuffer.draw_scene(scene, &state);
        self.frames += 1;
        tracing::trace!(frame = self.frames, drawn, "preview frame");

        let now = Instant::now();
        let dt = self.last_frame.map_or(0.0, |t| (now - t).as_secs_f32());
        self.last_frame = Some(now);

        let input = self.handle_input();
        if !input.is_idle() {
            self.camera.apply_input(&input, dt);
        }
    }

    /// Oldest pending action, or `None`.
    pub fn dequeue_action(&mut self) -> Option<Action> {
        self.actions.pop()
    }

    pub fn camera_pos(&self) -> Vec3 {
        self.camera.camera_pos()
    }

    pub fn mvp(&self) -> Mat4 {
        self.camera.mvp()
    }

    pub fn camera(&self) -> &CameraManager {
        &self.camera
    }

    /// Last rendered frame.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Poll the input source and fold its events into one frame of input.
    fn handle_input(&mut self) -> FrameInput {
        let mut frame = FrameInput::default();
        let mut pressed_now = HashSet::new();

        for event in self.input.poll() {
            match event {
                InputEvent::KeyDown(key) => {
                    // Auto-repeat: key already down, nothing new to report
                    if !self.held.insert(key) {
                        continue;
                    }
                    pressed_now.insert(key);
                    match key {
                        Key::Escape => self.actions.push(Action::Exit),
                        Key::P => self.actions.push(Action::TakePicture),
                        Key::O => self.actions.push(Action::OneShot),
                        _ => {
                            if let Some(step) = key.movement() {
                                frame.movement += step;
                            }
                        }
                    }
                }
                InputEvent::KeyUp(key) => {
                    self.held.remove(&key);
                }
                InputEvent::PointerMotion(delta) => frame.look += delta,
                InputEvent::Quit => self.actions.push(Action::Exit),
            }
        }

        // Keys held from earlier frames keep moving the camera
        for key in self.held.iter().filter(|k| !pressed_now.contains(*k)) {
            if let Some(step) = key.movement() {
                frame.movement += step;
            }
        }
        frame
    }
}

fn view_forward(state: &CameraState) -> Vec3 {
    state.forward_ray().map(|r| r.direction).unwrap_or(Vec3::Z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::demo;
    use crate::view::input::ScriptedInput;

    fn preview(frames: Vec<Vec<InputEvent>>) -> ViewPreview {
        let camera = CameraManager::interactive(
            Vec3::new(278.0, 273.0, -800.0),
            Vec3::new(278.0, 273.0, 0.0),
            5.56,
            1.0,
        );
        ViewPreview::new(camera, Box::new(ScriptedInput::new(frames)), 16, 16)
    }

    fn drain(preview: &mut ViewPreview) -> Vec<Action> {
        std::iter::from_fn(|| preview.dequeue_action()).collect()
    }

    #[test]
    fn test_keys_map_to_actions_in_order() {
        let mut events = ScriptedInput::tap(Key::P);
        events.extend(ScriptedInput::tap(Key::O));
        events.extend(ScriptedInput::tap(Key::Escape));
        let mut view = preview(vec![events]);

        assert_eq!(view.dequeue_action(), None);
        view.render(&Scene::new());
        assert_eq!(drain(&mut view), vec![Action::TakePicture, Action::OneShot, Action::Exit]);
        assert_eq!(view.dequeue_action(), None);
    }

    #[test]
    fn test_auto_repeat_is_ignored() {
        let down = InputEvent::KeyDown(Key::P);
        let mut view = preview(vec![
            vec![down, down],
            vec![down],
            vec![InputEvent::KeyUp(Key::P)],
            vec![down],
        ]);
        for _ in 0..4 {
            view.render(&Scene::new());
        }
        assert_eq!(drain(&mut view), vec![Action::TakePicture, Action::TakePicture]);
    }

    #[test]
    fn test_quit_event_requests_exit() {
        let mut view = preview(vec![vec![InputEvent::Quit]]);
        view.render(&Scene::new());
        assert_eq!(drain(&mut view), vec![Action::Exit]);
    }

    #[test]
    fn test_held_key_keeps_moving() {
        let mut view = preview(vec![vec![InputEvent::KeyDown(Key::W)], vec![], vec![]]);
        let start = view.camera_pos();

        view.render(&Scene::new());
        let first = view.camera_pos();
        view.render(&Scene::new());
        let second = view.camera_pos();

        assert!(first.z > start.z, "{start:?} -> {first:?}");
        assert!(second.z > first.z, "{first:?} -> {second:?}");
    }

    #[test]
    fn test_camera_stable_between_frames() {
        let mut view = preview(vec![vec![InputEvent::PointerMotion(glam::Vec2::new(10.0, 0.0))]]);
        let before = (view.camera_pos(), view.mvp());
        assert_eq!(before, (view.camera_pos(), view.mvp()));
        view.render(&Scene::new());
        assert_ne!(before.1, view.mvp());
        assert_eq!(view.mvp(), view.mvp());
    }

    #[test]
    fn test_renders_scene_geometry() {
        let mut scene = Scene::new();
        scene.add_mesh(demo::cornell_box().unwrap());
        let mut view = preview(vec![]);
        view.render(&scene);

        let fb = view.framebuffer();
        let backdrop = scene.skybox().sample(Vec3::Z);
        // The box fills the centre of the reference view
        assert_ne!(fb.pixel(8, 8), backdrop);
        assert_eq!(view.frames(), 1);
    }
}
