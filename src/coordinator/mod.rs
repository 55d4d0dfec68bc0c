//! Consistency Coordinator
//!
//! Every mutation runs as one load-transform-save cycle while holding the
//! locks of the collections it touches:
//! 1. Load the current snapshot(s) from the [`CollectionStore`]
//! 2. Apply a pure transformation from [`transforms`]
//! 3. Save the whole collection(s) back
//! 4. Return the updated snapshot to the caller
//!
//! Unreadable collections are treated as empty (degraded mode); the next
//! successful save overwrites them. A degraded snapshot of one collection is
//! never used to rewrite the other beyond the photo id being deleted.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::error::{GalleryError, GalleryResult};
use crate::ids;
use crate::locks::CollectionLocks;
use crate::models::{Album, Photo, PhotoPatch};
use crate::store::{BatchWriteError, Collection, CollectionStore, KeyValueStore, Record};

pub mod transforms;

/// Result of [`Coordinator::create_or_append_album`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumOutcome {
    Created(Album),
    Appended { album: Album, added: Vec<String> },
    /// Every requested photo was already in the album; nothing was written.
    NoChange(Album),
}

impl AlbumOutcome {
    pub fn album(&self) -> &Album {
        match self {
            AlbumOutcome::Created(album)
            | AlbumOutcome::Appended { album, .. }
            | AlbumOutcome::NoChange(album) => album,
        }
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, AlbumOutcome::NoChange(_))
    }
}

#[derive(Debug, Clone)]
pub struct AlbumUpdate {
    pub outcome: AlbumOutcome,
    pub albums: Vec<Album>,
}

#[derive(Debug, Clone)]
pub struct PhotoDeletion {
    /// The deleted record, `None` if the id was already gone.
    pub removed: Option<Photo>,
    pub removed_albums: Vec<String>,
    pub photos: Vec<Photo>,
    pub albums: Vec<Album>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumEntry {
    pub album_id: String,
    pub photo_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub dangling: Vec<AlbumEntry>,
    pub duplicate_entries: Vec<AlbumEntry>,
    pub invalid_covers: Vec<String>,
    pub empty_albums: Vec<String>,
    pub repaired: bool,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty()
            && self.duplicate_entries.is_empty()
            && self.invalid_covers.is_empty()
            && self.empty_albums.is_empty()
    }
}

#[derive(Clone)]
pub struct Coordinator {
    store: CollectionStore,
    locks: CollectionLocks,
}

impl Coordinator {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: CollectionStore::new(backend),
            locks: CollectionLocks::new(),
        }
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    async fn load<T: Record>(&self) -> GalleryResult<Vec<T>> {
        self.store
            .load::<T>()
            .await
            .map_err(|source| GalleryError::StoreUnavailable {
                collection: T::COLLECTION,
                source,
            })
    }

    async fn load_or_empty<T: Record>(&self) -> Vec<T> {
        self.load().await.unwrap_or_else(|err| {
            warn!("{} - treating collection as empty", err);
            Vec::new()
        })
    }

    async fn persist<T: Record>(&self, records: &[T]) -> GalleryResult<()> {
        self.store
            .save(records)
            .await
            .map_err(|source| GalleryError::StoreUnavailable {
                collection: T::COLLECTION,
                source,
            })
    }

    fn classify_batch_error(&self, err: BatchWriteError) -> GalleryError {
        let failed = Collection::from_key(&err.failed).unwrap_or(Collection::Photos);
        match err.written.first().and_then(|k| Collection::from_key(k)) {
            None => GalleryError::StoreUnavailable {
                collection: failed,
                source: err.source,
            },
            Some(written) => {
                error!(
                    "Partial write on {} backend: '{}' saved, '{}' failed: {}. Albums may hold dangling photo ids until repaired.",
                    self.store.backend_name(),
                    written,
                    failed,
                    err.source
                );
                GalleryError::PartialWriteFailure {
                    written,
                    failed,
                    source: err.source,
                }
            }
        }
    }

    pub async fn list_photos(&self) -> Vec<Photo> {
        self.load_or_empty().await
    }

    pub async fn list_albums(&self) -> Vec<Album> {
        self.load_or_empty().await
    }

    pub async fn find_album(&self, album_id: &str) -> GalleryResult<Album> {
        self.list_albums()
            .await
            .into_iter()
            .find(|album| album.id == album_id)
            .ok_or_else(|| GalleryError::album_not_found(album_id))
    }

    /// Appends a freshly captured photo and returns the new photo collection.
    pub async fn add_photo(&self, photo: Photo) -> GalleryResult<Vec<Photo>> {
        let _guard = self.locks.acquire(&[Collection::Photos]).await;

        let mut photos: Vec<Photo> = self.load_or_empty().await;
        let photo_id = photo.id.clone();
        transforms::append_photo(&mut photos, photo)?;
        self.persist(&photos).await?;

        info!("Added photo {} ({} total)", photo_id, photos.len());
        Ok(photos)
    }

    pub async fn update_photo(&self, photo_id: &str, patch: &PhotoPatch) -> GalleryResult<Photo> {
        if patch.is_empty() {
            return self
                .list_photos()
                .await
                .into_iter()
                .find(|p| p.id == photo_id)
                .ok_or_else(|| GalleryError::photo_not_found(photo_id));
        }
        self.modify_photo(photo_id, |photo| patch.apply(photo))
            .await
    }

    pub async fn set_caption(&self, photo_id: &str, caption: &str) -> GalleryResult<Photo> {
        self.update_photo(photo_id, &PhotoPatch::caption(caption))
            .await
    }

    pub async fn set_favorite(&self, photo_id: &str, favorite: bool) -> GalleryResult<Photo> {
        self.update_photo(photo_id, &PhotoPatch::favorite(favorite))
            .await
    }

    pub async fn toggle_favorite(&self, photo_id: &str) -> GalleryResult<Photo> {
        self.modify_photo(photo_id, |photo| photo.favorite = !photo.favorite)
            .await
    }

    /// Points the photo at new image bytes, e.g. after a rotate or crop.
    pub async fn replace_uri(&self, photo_id: &str, uri: &str) -> GalleryResult<Photo> {
        self.update_photo(photo_id, &PhotoPatch::uri(uri)).await
    }

    async fn modify_photo<F>(&self, photo_id: &str, change: F) -> GalleryResult<Photo>
    where
        F: FnOnce(&mut Photo) + Send,
    {
        let _guard = self.locks.acquire(&[Collection::Photos]).await;

        let mut photos: Vec<Photo> = self.load_or_empty().await;
        let updated = transforms::modify_photo(&mut photos, photo_id, change)?;
        self.persist(&photos).await?;

        info!("Updated photo {}", photo_id);
        Ok(updated)
    }

    /// Removes the photo and cascades into every album referencing it.
    /// Deleting an id that is already gone is a no-op.
    pub async fn delete_photo(&self, photo_id: &str) -> GalleryResult<PhotoDeletion> {
        let _guard = self
            .locks
            .acquire(&[Collection::Photos, Collection::Albums])
            .await;

        let mut photos: Vec<Photo> = self.load_or_empty().await;
        let mut albums: Vec<Album> = self.load_or_empty().await;

        let removed = transforms::remove_photo(&mut photos, photo_id);
        let cascade = transforms::cascade_photo_removal(&mut albums, photo_id);

        match (removed.is_some(), cascade.changed()) {
            (false, false) => {
                debug!("Photo {} already deleted, nothing to do", photo_id);
            }
            (true, false) => self.persist(&photos).await?,
            (false, true) => {
                warn!(
                    "Photo {} was missing but still referenced by albums, cleaning up",
                    photo_id
                );
                self.persist(&albums).await?
            }
            (true, true) => self
                .store
                .save_both(&photos, &albums)
                .await
                .map_err(|e| self.classify_batch_error(e))?,
        }

        if removed.is_some() || cascade.changed() {
            info!(
                "Deleted photo {} ({} albums updated, {} albums removed)",
                photo_id,
                cascade.updated_albums.len(),
                cascade.removed_albums.len()
            );
        }

        Ok(PhotoDeletion {
            removed,
            removed_albums: cascade.removed_albums,
            photos,
            albums,
        })
    }

    /// Adds `photo_ids` to the album whose name matches case-insensitively,
    /// or creates a new album when none does.
    pub async fn create_or_append_album(
        &self,
        name: &str,
        photo_ids: &[String],
    ) -> GalleryResult<AlbumUpdate> {
        let _guard = self
            .locks
            .acquire(&[Collection::Photos, Collection::Albums])
            .await;

        let photos: Vec<Photo> = self.load_or_empty().await;
        if let Some(missing) = photo_ids
            .iter()
            .find(|id| !photos.iter().any(|p| &p.id == *id))
        {
            return Err(GalleryError::photo_not_found(missing));
        }

        let mut albums: Vec<Album> = self.load_or_empty().await;
        let outcome = transforms::create_or_append(&mut albums, name, photo_ids, ids::new_id)?;

        match &outcome {
            AlbumOutcome::NoChange(album) => {
                debug!("Album '{}' already holds the requested photos", album.name);
            }
            AlbumOutcome::Created(album) => {
                self.persist(&albums).await?;
                info!(
                    "Created album '{}' ({}) with {} photos",
                    album.name,
                    album.id,
                    album.photo_ids.len()
                );
            }
            AlbumOutcome::Appended { album, added } => {
                self.persist(&albums).await?;
                info!("Added {} photos to album '{}'", added.len(), album.name);
            }
        }

        Ok(AlbumUpdate { outcome, albums })
    }

    /// Photos of `album` in album order. Ids without a photo are skipped.
    pub async fn get_album_photos(&self, album: &Album) -> Vec<Photo> {
        let photos: Vec<Photo> = self.load_or_empty().await;
        transforms::project_album_photos(&photos, album)
    }

    /// Reports album entries that break referential integrity and, with
    /// `repair`, rewrites the album collection to fix them.
    ///
    /// Unlike the other operations this never runs in degraded mode: an
    /// unreadable collection fails with `StoreUnavailable`, since auditing
    /// albums against an empty photo snapshot would flag every entry.
    pub async fn check_integrity(&self, repair: bool) -> GalleryResult<IntegrityReport> {
        let _guard = self
            .locks
            .acquire(&[Collection::Photos, Collection::Albums])
            .await;

        let photos: Vec<Photo> = self.load().await?;
        let mut albums: Vec<Album> = self.load().await?;

        let mut report = transforms::audit(&photos, &albums);
        if report.is_clean() {
            debug!("Integrity check passed for {} albums", albums.len());
            return Ok(report);
        }

        warn!(
            "Integrity check found {} dangling, {} duplicate, {} invalid covers, {} empty albums",
            report.dangling.len(),
            report.duplicate_entries.len(),
            report.invalid_covers.len(),
            report.empty_albums.len()
        );

        if repair && transforms::repair(&photos, &mut albums) {
            self.persist(&albums).await?;
            report.repaired = true;
            info!("Repaired album collection ({} albums remain)", albums.len());
        }

        Ok(report)
    }
}
