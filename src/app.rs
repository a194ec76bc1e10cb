//! Main loop: owns the scene and the ray-cast view, drives the preview.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;

use crate::camera::CameraManager;
use crate::config::Config;
use crate::export::{mean_color, ImageFileSink, PictureSink};
use crate::scene::{demo, ImageTexture, Mesh, PointLight, Scene, Skybox};
use crate::util::Result;
use crate::view::{Action, InputSource, LineInput, ViewPreview, ViewRayCaster};

/// Fly step at camera scale 1: a hundredth of the reference scene width.
const BASE_STEP: f32 = 5.56;

/// Preview frame pacing for the interactive run.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// What happened during one interactive frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Actions drained this frame, in order.
    pub actions: Vec<Action>,
    /// Captures that completed and reached the sink.
    pub pictures: usize,
    /// Object names (or `None` for a miss) of this frame's one-shot rays.
    pub oneshots: Vec<Option<String>>,
    pub exit: bool,
}

/// The renderer application.
pub struct App {
    config: Config,
    scene: Scene,
    raycaster: ViewRayCaster,
}

impl App {
    /// Load everything the config names. Any failure here is fatal and
    /// happens before the first frame.
    #[tracing::instrument(skip_all)]
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let mut scene = Scene::new();

        let mesh = match &config.scene {
            Some(path) => Mesh::load_obj(path)?,
            None => {
                tracing::info!("No scene given, using the built-in Cornell box");
                demo::cornell_box()?
            }
        };
        tracing::debug!("mesh {}: {} objects", mesh.name(), mesh.objects().len());
        scene.add_mesh(mesh);

        match &config.lights_file {
            Some(path) => scene.set_point_lights(PointLight::load_list(path)?),
            // The demo box comes with its ceiling light
            None if config.scene.is_none() => scene.add_point_light(demo::CORNELL_LIGHT),
            None => {}
        }
        scene.set_ambient(config.ambient_light);

        if let Some(path) = &config.skybox {
            scene.set_skybox(Skybox::Texture(Arc::new(ImageTexture::open(path)?)));
        }

        tracing::info!(
            "Scene ready: {} triangles, {} point lights, ambient {}",
            scene.triangle_count(),
            scene.point_lights().len(),
            scene.ambient_light()
        );
        Self::with_scene(config, scene)
    }

    /// Use an already assembled scene.
    pub fn with_scene(config: &Config, scene: Scene) -> Result<Self> {
        config.validate()?;
        let raycaster = ViewRayCaster::new(config.width, config.height)?;
        Ok(Self {
            config: config.clone(),
            scene,
            raycaster,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn raycaster(&self) -> &ViewRayCaster {
        &self.raycaster
    }

    /// Fixed viewpoint for batch captures.
    pub fn static_camera(&self) -> CameraManager {
        let bounds = self.scene.bounds();
        if self.config.frame_scene && !bounds.is_empty() {
            CameraManager::framing(&bounds, self.config.aspect())
        } else {
            CameraManager::fixed(self.config.camera_scale, self.config.aspect())
        }
    }

    /// Fly camera starting where the static camera stands.
    pub fn interactive_camera(&self) -> CameraManager {
        let start = self.static_camera().state();
        let eye = start.position;
        let forward = start.forward_ray().map(|r| r.direction).unwrap_or(Vec3::Z);

        let bounds = self.scene.bounds();
        let step = if self.config.frame_scene && !bounds.is_empty() {
            bounds.size().x.max(f32::EPSILON) / 100.0
        } else {
            BASE_STEP * self.config.camera_scale
        };
        CameraManager::interactive(eye, eye + forward, step, self.config.preview_aspect())
    }

    /// Preview at the configured size reading from `input`.
    pub fn preview(&self, input: Box<dyn InputSource>) -> ViewPreview {
        ViewPreview::new(
            self.interactive_camera(),
            input,
            self.config.preview_width,
            self.config.preview_height,
        )
    }

    /// Run the mode the config asks for, writing pictures to `output_dir`.
    pub fn run(&mut self) -> Result<()> {
        let mut sink = ImageFileSink::new(&self.config.output_dir, self.config.picture_format)?;
        if self.config.interactive {
            tracing::info!("Interactive mode: p = picture, o = oneshot, w/a/s/d/space/c = move, look DX DY, q = quit");
            let mut preview = self.preview(Box::new(LineInput::stdin()));
            let frames = self.run_interactive(&mut preview, &mut sink, FRAME_INTERVAL);
            tracing::info!("Session done: {frames} frames, {} pictures", sink.written().len());
            Ok(())
        } else {
            self.run_batch(&mut sink)
        }
    }

    /// One capture from the static camera.
    pub fn run_batch(&mut self, sink: &mut dyn PictureSink) -> Result<()> {
        let camera = self.static_camera();
        let image = self.raycaster.take_picture(camera.camera_pos(), camera.mvp(), &self.scene)?;
        tracing::debug!("mean picture colour {}", mean_color(&image));
        sink.store(image)
    }

    /// Alternate preview frames and action draining until `Exit`.
    /// Returns the number of frames rendered.
    pub fn run_interactive(
        &mut self,
        preview: &mut ViewPreview,
        sink: &mut dyn PictureSink,
        frame_interval: Duration,
    ) -> u64 {
        let mut frames = 0;
        loop {
            let started = Instant::now();
            let report = self.frame(preview, sink);
            frames += 1;
            if report.exit {
                return frames;
            }
            if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }

    /// One preview frame followed by a full drain of the action queue.
    pub fn frame(&mut self, preview: &mut ViewPreview, sink: &mut dyn PictureSink) -> FrameReport {
        preview.render(&self.scene);
        self.raycaster.render();

        let mut report = FrameReport::default();
        while let Some(action) = preview.dequeue_action() {
            tracing::debug!("action: {action}");
            report.actions.push(action);
            match action {
                // Finish the drain, then stop
                Action::Exit => report.exit = true,
                Action::TakePicture => {
                    if self.capture(preview, sink) {
                        report.pictures += 1;
                    }
                }
                Action::OneShot => report.oneshots.push(self.oneshot(preview)),
            }
        }
        report
    }

    /// Full capture from the preview camera. Failures are logged and the
    /// picture is dropped.
    fn capture(&mut self, preview: &ViewPreview, sink: &mut dyn PictureSink) -> bool {
        let mvp = preview.camera().mvp_for_aspect(self.config.aspect());
        let image = match self.raycaster.take_picture(preview.camera_pos(), mvp, &self.scene) {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("Picture capture failed: {e}");
                return false;
            }
        };
        match sink.store(image) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to store picture: {e}");
                false
            }
        }
    }

    fn oneshot(&self, preview: &ViewPreview) -> Option<String> {
        match self.raycaster.oneshot(preview.camera_pos(), preview.mvp(), &self.scene) {
            Ok(Some(id)) => {
                let name = self.scene.object_name(id).unwrap_or("<unnamed>").to_string();
                tracing::info!("hit: {name} ({id})");
                Some(name)
            }
            Ok(None) => {
                tracing::info!("miss");
                None
            }
            Err(e) => {
                tracing::warn!("Oneshot failed: {e}");
                None
            }
        }
    }
}
