//! Collaborator services the gallery calls through narrow contracts: camera
//! capture, image editing, and storage of image bytes. The core only ever
//! handles image references (file paths as strings), never pixel data.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod capture;
pub mod editor;
pub mod library;

pub use capture::FileCapture;
pub use editor::LocalImageEditor;
pub use library::LocalMediaLibrary;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationAngle {
    Rotate90,
    Rotate180,
    Rotate270,
}

impl RotationAngle {
    /// Normalizes any multiple of 90 degrees; a full turn is no rotation.
    pub fn from_degrees(degrees: i32) -> MediaResult<Option<Self>> {
        match degrees.rem_euclid(360) {
            0 => Ok(None),
            90 => Ok(Some(RotationAngle::Rotate90)),
            180 => Ok(Some(RotationAngle::Rotate180)),
            270 => Ok(Some(RotationAngle::Rotate270)),
            _ => Err(MediaError::InvalidEdit(format!(
                "Rotation must be a multiple of 90 degrees, got {}",
                degrees
            ))),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            RotationAngle::Rotate90 => 90,
            RotationAngle::Rotate180 => 180,
            RotationAngle::Rotate270 => 270,
        }
    }
}

/// Crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// An edit request. Crop is applied before rotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDescriptor {
    pub crop: Option<CropRect>,
    pub rotation: Option<RotationAngle>,
}

impl EditDescriptor {
    pub fn rotate(angle: RotationAngle) -> Self {
        Self {
            crop: None,
            rotation: Some(angle),
        }
    }

    pub fn crop(rect: CropRect) -> Self {
        Self {
            crop: Some(rect),
            rotation: None,
        }
    }

    pub fn then_rotate(mut self, angle: RotationAngle) -> Self {
        self.rotation = Some(angle);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.crop.is_none() && self.rotation.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub path: PathBuf,
    pub taken_at: DateTime<Utc>,
}

/// Produces a newly captured image.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn capture(&self) -> MediaResult<CapturedImage>;
}

/// Owns the stored image bytes.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Copies `source` into the library and returns the new reference.
    async fn import(&self, source: &Path) -> MediaResult<String>;

    /// Deletes the bytes behind `uri`. Deleting a missing file succeeds.
    async fn remove(&self, uri: &str) -> MediaResult<()>;
}

/// Applies an edit and returns a reference to the newly written image.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn apply(&self, uri: &str, edit: &EditDescriptor) -> MediaResult<String>;
}
