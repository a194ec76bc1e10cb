//! Writing captured pictures to disk.

use std::path::{Path, PathBuf};

use glam::Vec3;
use image::{DynamicImage, Rgb32FImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};
use crate::view::CapturedImage;

/// Receives finished captures from the main loop.
pub trait PictureSink {
    /// Persist one complete picture.
    fn store(&mut self, image: CapturedImage) -> Result<()>;
}

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PictureFormat {
    /// 8-bit sRGB, values clamped to `[0, 1]`
    #[default]
    Png,
    /// Radiance HDR, linear
    Hdr,
    /// OpenEXR, linear
    Exr,
}

impl PictureFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Hdr => "hdr",
            Self::Exr => "exr",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "hdr" => Some(Self::Hdr),
            "exr" => Some(Self::Exr),
            _ => None,
        }
    }
}

/// Writes `picture_NNNN.<ext>` files into a directory, never overwriting.
pub struct ImageFileSink {
    dir: PathBuf,
    format: PictureFormat,
    next_index: u32,
    written: Vec<PathBuf>,
}

impl ImageFileSink {
    /// Creates `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, format: PictureFormat) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            format,
            next_index: 0,
            written: Vec::new(),
        })
    }

    /// Files written so far, oldest first.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn next_path(&mut self) -> PathBuf {
        loop {
            let path = self
                .dir
                .join(format!("picture_{:04}.{}", self.next_index, self.format.extension()));
            self.next_index += 1;
            if !path.exists() {
                return path;
            }
        }
    }
}

impl PictureSink for ImageFileSink {
    fn store(&mut self, image: CapturedImage) -> Result<()> {
        let path = self.next_path();
        save_picture(&image, &path)?;
        tracing::info!("Saved picture {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Save `image` to `path`; the format follows the file extension.
pub fn save_picture(image: &CapturedImage, path: &Path) -> Result<()> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(PictureFormat::from_extension)
        .ok_or_else(|| Error::other(format!("unsupported picture format: {}", path.display())))?;

    tracing::debug!(?format, "writing {}x{} picture", image.width(), image.height());
    match format {
        PictureFormat::Png => to_rgb8(image)?.save(path)?,
        PictureFormat::Hdr | PictureFormat::Exr => DynamicImage::ImageRgb32F(to_rgb32f(image)?).save(path)?,
    }
    Ok(())
}

/// Clamp, sRGB-encode and quantize to 8 bits.
pub fn to_rgb8(image: &CapturedImage) -> Result<RgbImage> {
    let bytes = image
        .pixels()
        .iter()
        .flat_map(|p| p.to_array())
        .map(|c| (linear_to_srgb(c) * 255.0).round() as u8)
        .collect();
    RgbImage::from_raw(image.width(), image.height(), bytes).ok_or_else(|| Error::other("picture buffer size mismatch"))
}

/// Linear float image, values untouched.
pub fn to_rgb32f(image: &CapturedImage) -> Result<Rgb32FImage> {
    let floats: &[f32] = bytemuck::cast_slice(image.pixels());
    Rgb32FImage::from_raw(image.width(), image.height(), floats.to_vec())
        .ok_or_else(|| Error::other("picture buffer size mismatch"))
}

/// sRGB transfer function on one clamped channel.
pub fn linear_to_srgb(c: f32) -> f32 {
    let c = if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) };
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Keeps captures in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub pictures: Vec<CapturedImage>,
}

impl PictureSink for MemorySink {
    fn store(&mut self, image: CapturedImage) -> Result<()> {
        self.pictures.push(image);
        Ok(())
    }
}

/// Average colour, handy for log lines and quick checks.
pub fn mean_color(image: &CapturedImage) -> Vec3 {
    let n = image.pixels().len().max(1) as f32;
    image.pixels().iter().copied().sum::<Vec3>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraManager;
    use crate::scene::{Scene, Skybox};
    use crate::view::ViewRayCaster;

    fn solid_picture(color: Vec3) -> CapturedImage {
        let mut scene = Scene::new();
        scene.set_skybox(Skybox::Solid(color));
        let cam = CameraManager::fixed(1.0, 2.0);
        let mut view = ViewRayCaster::new(4, 2).unwrap();
        view.take_picture(cam.camera_pos(), cam.mvp(), &scene).unwrap()
    }

    #[test]
    fn test_srgb_curve() {
        assert_eq!(linear_to_srgb(0.0), 0.0);
        assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-6);
        assert!((linear_to_srgb(0.5) - 0.7354).abs() < 1e-3);
        assert_eq!(linear_to_srgb(5.0), linear_to_srgb(1.0));
        assert_eq!(linear_to_srgb(f32::NAN), 0.0);
    }

    #[test]
    fn test_png_sink_numbers_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut sink = ImageFileSink::new(dir.path().join("out"), PictureFormat::Png).unwrap();
        sink.store(solid_picture(Vec3::new(1.0, 0.5, 0.0))).unwrap();
        sink.store(solid_picture(Vec3::ZERO)).unwrap();

        let names: Vec<_> = sink
            .written()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["picture_0000.png", "picture_0001.png"]);

        let png = image::open(&sink.written()[0]).expect("readable png").to_rgb8();
        assert_eq!(png.dimensions(), (4, 2));
        assert_eq!(png.get_pixel(0, 0).0, [255, 188, 0]);
    }

    #[test]
    fn test_sink_skips_existing_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("picture_0000.hdr"), b"taken").expect("seed file");
        let mut sink = ImageFileSink::new(dir.path(), PictureFormat::Hdr).unwrap();
        sink.store(solid_picture(Vec3::splat(4.0))).unwrap();
        assert!(sink.written()[0].ends_with("picture_0001.hdr"));

        // HDR keeps values above 1
        let hdr = image::open(&sink.written()[0]).expect("readable hdr").to_rgb32f();
        assert!(hdr.get_pixel(1, 1).0[0] > 3.5);
    }

    #[test]
    fn test_unknown_extension() {
        let image = solid_picture(Vec3::ONE);
        assert!(save_picture(&image, Path::new("picture.bmp")).is_err());
    }

    #[test]
    fn test_mean_color() {
        assert_eq!(mean_color(&solid_picture(Vec3::splat(0.25))), Vec3::splat(0.25));
    }
}
