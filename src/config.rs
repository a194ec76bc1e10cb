//! Run configuration.
//!
//! Built once at startup from defaults, an optional JSON file and
//! command-line overrides (in that order), then passed to [`crate::app::App`].

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::export::PictureFormat;
use crate::util::{Error, Result};

/// Largest accepted picture or preview side, in pixels.
pub const MAX_SIDE: u32 = 16384;

/// Everything the renderer needs to know before the first frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Mode
    pub interactive: bool,

    // Scene
    /// OBJ file; the built-in Cornell box when unset.
    pub scene: Option<PathBuf>,
    /// JSON light list.
    pub lights_file: Option<PathBuf>,
    /// Equirectangular backdrop image.
    pub skybox: Option<PathBuf>,
    /// Ambient term used once the scene has point lights.
    pub ambient_light: Vec3,

    // Output picture
    pub width: u32,
    pub height: u32,
    pub output_dir: PathBuf,
    pub picture_format: PictureFormat,

    // Preview
    pub preview_width: u32,
    pub preview_height: u32,

    // Camera
    /// Multiplies the reference viewpoint and sets the fly step.
    pub camera_scale: f32,
    /// Derive the static viewpoint from scene bounds.
    pub frame_scene: bool,

    // Logging
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interactive: false,
            scene: None,
            lights_file: None,
            skybox: None,
            ambient_light: Vec3::splat(0.1),
            width: 512,
            height: 512,
            output_dir: PathBuf::from("."),
            picture_format: PictureFormat::Png,
            preview_width: 160,
            preview_height: 120,
            camera_scale: 1.0,
            frame_scene: false,
            verbose: false,
            log_file: None,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Config),
    Help,
}

impl Config {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// Save as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Build from command-line arguments (without the program name).
    pub fn from_args<I, S>(args: I) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        // Config file first, so flags override it regardless of position
        let mut config = match find_config_path(&args)? {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        let mut it = args.iter();
        while let Some(arg) = it.next() {
            let mut value = |name: &str| {
                it.next()
                    .cloned()
                    .ok_or_else(|| Error::config(format!("{name} needs a value")))
            };
            match arg.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "-c" | "--config" => {
                    value(arg)?;
                }
                "-i" | "--interactive" => config.interactive = true,
                "-b" | "--batch" => config.interactive = false,
                "-v" | "--verbose" => config.verbose = true,
                "--frame" => config.frame_scene = true,
                "--scene" => config.scene = Some(value(arg)?.into()),
                "--lights" => config.lights_file = Some(value(arg)?.into()),
                "--skybox" => config.skybox = Some(value(arg)?.into()),
                "-o" | "--output" => config.output_dir = value(arg)?.into(),
                "--log-file" => config.log_file = Some(value(arg)?.into()),
                "--format" => {
                    let v = value(arg)?;
                    config.picture_format = PictureFormat::from_extension(&v)
                        .ok_or_else(|| Error::config(format!("--format: expected png, hdr or exr, got {v}")))?;
                }
                "--ambient" => config.ambient_light = parse_color(&value(arg)?)?,
                "--size" => {
                    (config.width, config.height) = parse_size(&value(arg)?)?;
                }
                "--preview-size" => {
                    (config.preview_width, config.preview_height) = parse_size(&value(arg)?)?;
                }
                "--scale" => {
                    let v = value(arg)?;
                    config.camera_scale = v
                        .parse()
                        .map_err(|_| Error::config(format!("--scale: not a number: {v}")))?;
                }
                other if other.starts_with('-') => {
                    return Err(Error::config(format!("unknown option: {other}")));
                }
                // Bare path is the scene
                path => config.scene = Some(path.into()),
            }
        }

        config.validate()?;
        Ok(Command::Run(config))
    }

    /// Reject values no renderer can work with.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::config(format!("picture size must be non-zero, got {}x{}", self.width, self.height)));
        }
        if self.preview_width == 0 || self.preview_height == 0 {
            return Err(Error::config(format!(
                "preview size must be non-zero, got {}x{}",
                self.preview_width, self.preview_height
            )));
        }
        let longest = self.width.max(self.height).max(self.preview_width).max(self.preview_height);
        if longest > MAX_SIDE {
            return Err(Error::config(format!("image sides are limited to {MAX_SIDE} pixels, got {longest}")));
        }
        if !(self.camera_scale.is_finite() && self.camera_scale > 0.0) {
            return Err(Error::config(format!("camera_scale must be positive, got {}", self.camera_scale)));
        }
        if !self.ambient_light.is_finite() || self.ambient_light.min_element() < 0.0 {
            return Err(Error::config(format!("ambient_light must be a non-negative color, got {}", self.ambient_light)));
        }
        Ok(())
    }

    /// Picture aspect ratio.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn preview_aspect(&self) -> f32 {
        self.preview_width as f32 / self.preview_height as f32
    }
}

fn find_config_path(args: &[String]) -> Result<Option<PathBuf>> {
    match args.iter().position(|a| a == "-c" || a == "--config") {
        Some(i) => args
            .get(i + 1)
            .map(|p| Some(PathBuf::from(p)))
            .ok_or_else(|| Error::config("--config needs a value")),
        None => Ok(None),
    }
}

/// `WxH`, e.g. `640x480`.
fn parse_size(s: &str) -> Result<(u32, u32)> {
    let bad = || Error::config(format!("expected WIDTHxHEIGHT, got {s}"));
    let (w, h) = s.split_once(['x', 'X']).ok_or_else(bad)?;
    Ok((w.trim().parse().map_err(|_| bad())?, h.trim().parse().map_err(|_| bad())?))
}

/// `r,g,b` or a single grey value.
fn parse_color(s: &str) -> Result<Vec3> {
    let bad = || Error::config(format!("expected r,g,b, got {s}"));
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|_| bad()))
        .collect::<Result<Vec<_>>>()?;
    match parts[..] {
        [v] => Ok(Vec3::splat(v)),
        [r, g, b] => Ok(Vec3::new(r, g, b)),
        _ => Err(bad()),
    }
}
