//! End-to-end rendering scenarios: captures, lighting rules, batch output.

use glam::Vec3;
use raycaster::app::App;
use raycaster::camera::CameraManager;
use raycaster::config::Config;
use raycaster::export::{ImageFileSink, MemorySink, PictureFormat};
use raycaster::scene::{demo, PointLight, Scene, Skybox, DEFAULT_AMBIENT};
use raycaster::tracer::PathTracer;
use raycaster::view::raycast::pixel_ndc;
use raycaster::view::{Action, Key, ScriptedInput, ViewRayCaster};

use tempfile::TempDir;

fn cornell_scene() -> Scene {
    let mut scene = Scene::new();
    scene.add_mesh(demo::cornell_box().expect("Failed to build Cornell box"));
    scene
}

#[test]
fn test_empty_scene_with_lights_is_backdrop_only() {
    let mut scene = Scene::new();
    scene.add_point_light(PointLight::new(Vec3::new(278.0, 448.0, 279.5), Vec3::splat(0.7)));
    scene.set_ambient(Vec3::splat(0.3));
    scene.set_skybox(Skybox::Solid(Vec3::new(0.2, 0.4, 0.6)));

    let camera = CameraManager::fixed(1.0, 1.0);
    let mut view = ViewRayCaster::new(6, 6).expect("Failed to create view");
    let picture = view
        .take_picture(camera.camera_pos(), camera.mvp(), &scene)
        .expect("Capture failed");
    assert!(picture.pixels().iter().all(|&p| p == Vec3::new(0.2, 0.4, 0.6)));
}

#[test]
fn test_ambient_follows_light_list() {
    let mut scene = cornell_scene();
    scene.set_ambient(Vec3::splat(0.05));
    assert_eq!(scene.ambient_light(), DEFAULT_AMBIENT);

    scene.add_point_light(demo::CORNELL_LIGHT);
    assert_eq!(scene.ambient_light(), Vec3::splat(0.05));

    // Without lights every hit is lit by the full default ambient term
    scene.set_point_lights(Vec::new());
    let tracer = PathTracer::new();
    let camera = CameraManager::fixed(1.0, 1.0).state();
    let ray = camera.forward_ray().expect("Forward ray");
    let hit = tracer.intersect(&ray, &scene).expect("Centre ray hits the box");
    let albedo = scene.object(hit.object).expect("Hit object exists").material.diffuse;
    assert_eq!(tracer.trace(ray.origin, ray.direction, &scene).unwrap(), albedo * DEFAULT_AMBIENT);
}

#[test]
fn test_debug_trace_agrees_with_picture() {
    let mut scene = cornell_scene();
    scene.add_point_light(demo::CORNELL_LIGHT);
    let backdrop = Vec3::new(1.0, 0.0, 1.0);
    scene.set_skybox(Skybox::Solid(backdrop));

    let camera = CameraManager::fixed(1.0, 1.0);
    let (w, h) = (12, 12);
    let mut view = ViewRayCaster::new(w, h).expect("Failed to create view");
    let picture = view
        .take_picture(camera.camera_pos(), camera.mvp(), &scene)
        .expect("Capture failed");

    let state = camera.state();
    let tracer = PathTracer::new();
    for y in 0..h {
        for x in 0..w {
            let ray = state.ray_through(pixel_ndc(x, y, w, h)).expect("Pixel ray");
            let hit = tracer.debug_trace(ray.origin, ray.direction, &scene).unwrap();
            // A miss shows the backdrop, a hit never does (no surface is magenta)
            assert_eq!(hit.is_none(), picture.pixel(x, y) == backdrop, "pixel {x},{y}");
        }
    }
}

#[test]
fn test_shadowed_floor_is_darker() {
    let mut scene = cornell_scene();
    scene.add_point_light(demo::CORNELL_LIGHT);
    scene.set_ambient(Vec3::splat(0.1));
    let tracer = PathTracer::new();

    // Floor behind the tall block vs floor with a clear view of the light
    let shadowed = tracer
        .trace(Vec3::new(300.0, 10.0, 480.0), -Vec3::Y, &scene)
        .unwrap();
    let open = tracer.trace(Vec3::new(450.0, 10.0, 100.0), -Vec3::Y, &scene).unwrap();
    assert!(open.length() > shadowed.length(), "open {open:?} vs shadowed {shadowed:?}");
}

#[test]
fn test_batch_run_writes_png() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config {
        width: 16,
        height: 12,
        output_dir: dir.path().join("pictures"),
        ..Default::default()
    };
    let mut app = App::from_config(&config).expect("Failed to build app");
    app.run().expect("Batch run failed");

    let png = dir.path().join("pictures").join("picture_0000.png");
    let picture = image::open(&png).expect("Failed to read picture").to_rgb8();
    assert_eq!(picture.dimensions(), (16, 12));
    assert_eq!(app.raycaster().captures(), 1);
}

#[test]
fn test_interactive_capture_uses_picture_size() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config {
        width: 10,
        height: 5,
        preview_width: 8,
        preview_height: 8,
        ..Default::default()
    };
    let mut app = App::from_config(&config).expect("Failed to build app");
    let script = vec![ScriptedInput::tap(Key::P), ScriptedInput::tap(Key::P)];
    let mut preview = app.preview(Box::new(ScriptedInput::new(script).then_quit()));
    let mut sink = ImageFileSink::new(dir.path(), PictureFormat::Png).expect("Failed to create sink");

    let frames = app.run_interactive(&mut preview, &mut sink, std::time::Duration::ZERO);
    assert_eq!(frames, 3);
    assert_eq!(sink.written().len(), 2);
    for path in sink.written() {
        let picture = image::open(path).expect("Failed to read picture");
        assert_eq!((picture.width(), picture.height()), (10, 5));
    }
}

#[test]
fn test_one_capture_per_press() {
    let mut app = App::from_config(&Config {
        width: 4,
        height: 4,
        ..Default::default()
    })
    .expect("Failed to build app");

    let held = raycaster::view::InputEvent::KeyDown(Key::P);
    let script = vec![vec![held], vec![held], vec![held], vec![]];
    let mut preview = app.preview(Box::new(ScriptedInput::new(script)));
    let mut sink = MemorySink::default();

    let mut actions = Vec::new();
    for _ in 0..4 {
        actions.extend(app.frame(&mut preview, &mut sink).actions);
    }
    assert_eq!(actions, [Action::TakePicture]);
    assert_eq!(sink.pictures.len(), 1);
    assert_eq!(app.raycaster().frames_presented(), 4);
}
