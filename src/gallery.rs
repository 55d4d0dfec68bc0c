use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};

use crate::config::{Config, StoreBackend};
use crate::coordinator::{AlbumUpdate, Coordinator, IntegrityReport, PhotoDeletion};
use crate::error::{GalleryError, GalleryResult};
use crate::ids;
use crate::locks::KeyedLocks;
use crate::media::{
    CaptureSource, EditDescriptor, ImageEditor, LocalImageEditor, LocalMediaLibrary, MediaLibrary,
};
use crate::models::{Album, Photo};
use crate::store::{Collection, JsonFileStore, KeyValueStore, MemoryStore, SqliteStore};
use crate::timeline::{self, DayCount, DaySection};

/// User-level gallery operations: the coordinator plus the services that
/// own image bytes.
#[derive(Clone)]
pub struct Gallery {
    coordinator: Coordinator,
    library: Arc<dyn MediaLibrary>,
    editor: Arc<dyn ImageEditor>,
    // Held across uri read, file edit and uri swap of one photo
    photo_locks: KeyedLocks,
}

impl Gallery {
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        library: Arc<dyn MediaLibrary>,
        editor: Arc<dyn ImageEditor>,
    ) -> Self {
        Self {
            coordinator: Coordinator::new(backend),
            library,
            editor,
            photo_locks: KeyedLocks::new(),
        }
    }

    /// Opens the configured store and local media services.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let backend: Arc<dyn KeyValueStore> = match config.store_backend {
            StoreBackend::Json => Arc::new(
                JsonFileStore::open(&config.collections_path)
                    .await
                    .context("Failed to open collection directory")?,
            ),
            StoreBackend::Sqlite => Arc::new(
                SqliteStore::open(&config.db_path)
                    .await
                    .context("Failed to open collection database")?,
            ),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };

        info!(
            "Gallery opened with {} store, media in {}",
            backend.name(),
            config.media_path
        );

        Ok(Self::new(
            backend,
            Arc::new(LocalMediaLibrary::new(&config.media_path)),
            Arc::new(LocalImageEditor::new()),
        ))
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Captures an image, copies it into the library and records it.
    pub async fn capture_photo(&self, source: &dyn CaptureSource) -> GalleryResult<Photo> {
        let captured = source.capture().await?;
        let uri = self.library.import(&captured.path).await?;
        let photo = Photo::new(ids::new_id(), uri, captured.taken_at);

        if let Err(e) = self.coordinator.add_photo(photo.clone()).await {
            self.discard_file(&photo.uri).await;
            return Err(e);
        }

        Ok(photo)
    }

    pub async fn set_caption(&self, photo_id: &str, caption: &str) -> GalleryResult<Photo> {
        self.coordinator.set_caption(photo_id, caption).await
    }

    pub async fn toggle_favorite(&self, photo_id: &str) -> GalleryResult<Photo> {
        self.coordinator.toggle_favorite(photo_id).await
    }

    /// Rotates and/or crops a photo into a new file and points the record at it.
    /// Edits of the same photo run one after another, each starting from the
    /// previous result.
    pub async fn edit_photo(&self, photo_id: &str, edit: &EditDescriptor) -> GalleryResult<Photo> {
        let _guard = self.photo_locks.acquire(photo_id).await;

        let photo = self
            .find_photo(photo_id)
            .await
            .ok_or_else(|| GalleryError::photo_not_found(photo_id))?;

        let new_uri = self.editor.apply(&photo.uri, edit).await?;

        match self.coordinator.replace_uri(photo_id, &new_uri).await {
            Ok(updated) => {
                self.discard_file(&photo.uri).await;
                Ok(updated)
            }
            Err(e) => {
                self.discard_file(&new_uri).await;
                Err(e)
            }
        }
    }

    /// Deletes the record, cascades into albums, then removes the image bytes.
    pub async fn delete_photo(&self, photo_id: &str) -> GalleryResult<PhotoDeletion> {
        let _guard = self.photo_locks.acquire(photo_id).await;
        let existing = self.find_photo(photo_id).await;

        match self.coordinator.delete_photo(photo_id).await {
            Ok(deletion) => {
                if let Some(photo) = &deletion.removed {
                    self.discard_file(&photo.uri).await;
                }
                Ok(deletion)
            }
            Err(
                e @ GalleryError::PartialWriteFailure {
                    written: Collection::Photos,
                    ..
                },
            ) => {
                // The record is gone even though the albums were not updated
                if let Some(photo) = existing {
                    self.discard_file(&photo.uri).await;
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn add_to_album(&self, name: &str, photo_ids: &[String]) -> GalleryResult<AlbumUpdate> {
        self.coordinator.create_or_append_album(name, photo_ids).await
    }

    pub async fn album_photos(&self, album_id: &str) -> GalleryResult<Vec<Photo>> {
        let album = self.coordinator.find_album(album_id).await?;
        Ok(self.coordinator.get_album_photos(&album).await)
    }

    pub async fn photos(&self) -> Vec<Photo> {
        self.coordinator.list_photos().await
    }

    pub async fn albums(&self) -> Vec<Album> {
        self.coordinator.list_albums().await
    }

    pub async fn favorites(&self) -> Vec<Photo> {
        timeline::favorites(&self.photos().await)
    }

    pub async fn timeline(&self) -> Vec<DaySection> {
        timeline::group_by_day(&self.photos().await)
    }

    pub async fn day_counts(&self) -> Vec<DayCount> {
        timeline::day_counts(&self.photos().await)
    }

    pub async fn check_integrity(&self, repair: bool) -> GalleryResult<IntegrityReport> {
        self.coordinator.check_integrity(repair).await
    }

    async fn find_photo(&self, photo_id: &str) -> Option<Photo> {
        self.coordinator
            .list_photos()
            .await
            .into_iter()
            .find(|p| p.id == photo_id)
    }

    async fn discard_file(&self, uri: &str) {
        if let Err(e) = self.library.remove(uri).await {
            warn!("Failed to delete file {}: {}", uri, e);
        }
    }
}
