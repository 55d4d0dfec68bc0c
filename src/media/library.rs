use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info, warn};

use super::{MediaError, MediaLibrary, MediaResult};
use crate::ids;

/// Image bytes stored as file copies under one directory.
#[derive(Debug, Clone)]
pub struct LocalMediaLibrary {
    root: PathBuf,
}

impl LocalMediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only files inside the library directory are ever deleted. The part
    /// below the root must be plain names, so `..` cannot climb out of it.
    pub fn owns(&self, path: &Path) -> bool {
        path.strip_prefix(&self.root).is_ok_and(|rest| {
            rest.components().next().is_some()
                && rest.components().all(|c| matches!(c, Component::Normal(_)))
        })
    }
}

#[async_trait]
impl MediaLibrary for LocalMediaLibrary {
    async fn import(&self, source: &Path) -> MediaResult<String> {
        if tokio::fs::metadata(source).await.is_err() {
            return Err(MediaError::FileNotFound(source.display().to_string()));
        }

        tokio::fs::create_dir_all(&self.root).await?;

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "jpg".to_string());
        let destination = self
            .root
            .join(format!("photo_{}.{}", ids::new_id(), extension));

        tokio::fs::copy(source, &destination).await?;
        info!(
            "Imported {} -> {}",
            source.display(),
            destination.display()
        );

        Ok(destination.to_string_lossy().to_string())
    }

    async fn remove(&self, uri: &str) -> MediaResult<()> {
        let path = Path::new(uri);
        if !self.owns(path) {
            warn!("Refusing to delete file outside the media library: {}", uri);
            return Ok(());
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!("Deleted file: {}", uri);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("File already gone: {}", uri);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
