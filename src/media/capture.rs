use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CaptureSource, CapturedImage, MediaError, MediaResult};

/// Treats an existing image file as a fresh capture, like picking a shot the
/// camera has just written to disk.
#[derive(Debug, Clone)]
pub struct FileCapture {
    path: PathBuf,
    taken_at: Option<DateTime<Utc>>,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            taken_at: None,
        }
    }

    /// Overrides the capture time, which otherwise is the moment of capture.
    pub fn taken_at(mut self, taken_at: DateTime<Utc>) -> Self {
        self.taken_at = Some(taken_at);
        self
    }
}

#[async_trait]
impl CaptureSource for FileCapture {
    async fn capture(&self) -> MediaResult<CapturedImage> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|_| MediaError::FileNotFound(self.path.display().to_string()))?;
        if !metadata.is_file() {
            return Err(MediaError::FileNotFound(self.path.display().to_string()));
        }

        Ok(CapturedImage {
            path: self.path.clone(),
            taken_at: self.taken_at.unwrap_or_else(Utc::now),
        })
    }
}
