//! Error types for the renderer.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scene setup and rendering.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Configuration value is missing or out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Mesh import failed
    #[error("Failed to load mesh {path}: {message}")]
    MeshLoad { path: PathBuf, message: String },

    /// Ray direction is zero-length or not finite
    #[error("Degenerate ray: origin {origin:?}, direction {direction:?}")]
    DegenerateRay { origin: [f32; 3], direction: [f32; 3] },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a config or light file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image decode or encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True for errors that stop the program before rendering starts.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_) | Self::InvalidConfig(_) | Self::MeshLoad { .. } | Self::Json(_)
        )
    }
}

/// Result type alias for renderer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::FileNotFound(PathBuf::from("scene.obj"));
        assert!(e.to_string().contains("scene.obj"));

        let e = Error::DegenerateRay { origin: [0.0; 3], direction: [0.0; 3] };
        assert!(e.to_string().contains("Degenerate"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_setup_error());
    }

    #[test]
    fn test_setup_errors() {
        assert!(Error::config("width must be positive").is_setup_error());
        assert!(!Error::other("capture failed").is_setup_error());
    }
}
