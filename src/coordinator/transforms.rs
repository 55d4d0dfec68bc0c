//! Pure snapshot transformations behind every coordinator operation.
//!
//! Nothing here touches the store; each function takes the loaded snapshot
//! and mutates or projects it in place.

use std::collections::{HashMap, HashSet};

use super::{AlbumEntry, AlbumOutcome, IntegrityReport};
use crate::error::{GalleryError, GalleryResult};
use crate::models::{Album, Photo};

pub fn append_photo(photos: &mut Vec<Photo>, photo: Photo) -> GalleryResult<()> {
    if photos.iter().any(|p| p.id == photo.id) {
        return Err(GalleryError::DuplicateId(photo.id));
    }
    photos.push(photo);
    Ok(())
}

/// Applies `change` to the photo with `id` and returns the updated record.
pub fn modify_photo<F>(photos: &mut [Photo], id: &str, change: F) -> GalleryResult<Photo>
where
    F: FnOnce(&mut Photo),
{
    let photo = photos
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| GalleryError::photo_not_found(id))?;
    change(photo);
    Ok(photo.clone())
}

pub fn remove_photo(photos: &mut Vec<Photo>, id: &str) -> Option<Photo> {
    let index = photos.iter().position(|p| p.id == id)?;
    Some(photos.remove(index))
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Cascade {
    pub updated_albums: Vec<String>,
    pub removed_albums: Vec<String>,
}

impl Cascade {
    pub fn changed(&self) -> bool {
        !self.updated_albums.is_empty() || !self.removed_albums.is_empty()
    }
}

/// Drops `photo_id` from every album, moving covers as needed, and removes
/// albums left without photos.
pub fn cascade_photo_removal(albums: &mut Vec<Album>, photo_id: &str) -> Cascade {
    let mut cascade = Cascade::default();

    for album in albums.iter_mut() {
        if album.remove_photo(photo_id) {
            if album.is_empty() {
                cascade.removed_albums.push(album.id.clone());
            } else {
                cascade.updated_albums.push(album.id.clone());
            }
        }
    }

    if !cascade.removed_albums.is_empty() {
        albums.retain(|album| !album.is_empty() || !album_was_emptied(&cascade, album));
    }

    cascade
}

fn album_was_emptied(cascade: &Cascade, album: &Album) -> bool {
    cascade.removed_albums.iter().any(|id| *id == album.id)
}

/// Collapses repeated ids, keeping the first occurrence order.
pub fn unique_photo_ids(photo_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    photo_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Merges `photo_ids` into the album named `name` (case-insensitive), or
/// creates it with an id from `new_id`.
pub fn create_or_append<F>(
    albums: &mut Vec<Album>,
    name: &str,
    photo_ids: &[String],
    new_id: F,
) -> GalleryResult<AlbumOutcome>
where
    F: FnOnce() -> String,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(GalleryError::InvalidInput(
            "Album name must not be empty".to_string(),
        ));
    }

    let photo_ids = unique_photo_ids(photo_ids);

    if let Some(album) = albums.iter_mut().find(|a| a.name_matches(name)) {
        let added = album.append_photos(&photo_ids);
        if added.is_empty() {
            return Ok(AlbumOutcome::NoChange(album.clone()));
        }
        return Ok(AlbumOutcome::Appended {
            album: album.clone(),
            added,
        });
    }

    if photo_ids.is_empty() {
        return Err(GalleryError::InvalidInput(
            "A new album needs at least one photo".to_string(),
        ));
    }

    let album = Album::new(new_id(), name, photo_ids);
    albums.push(album.clone());
    Ok(AlbumOutcome::Created(album))
}

/// Photos of `album` in its `photo_ids` order. Ids without a photo are
/// skipped.
pub fn project_album_photos(photos: &[Photo], album: &Album) -> Vec<Photo> {
    let by_id: HashMap<&str, &Photo> = photos.iter().map(|p| (p.id.as_str(), p)).collect();
    album
        .photo_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).map(|p| (*p).clone()))
        .collect()
}

pub fn audit(photos: &[Photo], albums: &[Album]) -> IntegrityReport {
    let known: HashSet<&str> = photos.iter().map(|p| p.id.as_str()).collect();
    let mut report = IntegrityReport::default();

    for album in albums {
        let mut seen = HashSet::new();
        for photo_id in &album.photo_ids {
            let entry = AlbumEntry {
                album_id: album.id.clone(),
                photo_id: photo_id.clone(),
            };
            if !seen.insert(photo_id.as_str()) {
                report.duplicate_entries.push(entry);
            } else if !known.contains(photo_id.as_str()) {
                report.dangling.push(entry);
            }
        }

        if let Some(cover) = &album.cover_photo_id {
            if !album.contains(cover) || !known.contains(cover.as_str()) {
                report.invalid_covers.push(album.id.clone());
            }
        }

        if album.is_empty() {
            report.empty_albums.push(album.id.clone());
        }
    }

    report
}

/// Restores referential integrity of `albums` against `photos`. Returns
/// whether anything changed.
pub fn repair(photos: &[Photo], albums: &mut Vec<Album>) -> bool {
    let known: HashSet<&str> = photos.iter().map(|p| p.id.as_str()).collect();
    let before = albums.clone();

    for album in albums.iter_mut() {
        let mut seen = HashSet::new();
        album
            .photo_ids
            .retain(|id| known.contains(id.as_str()) && seen.insert(id.clone()));

        let cover_valid = album
            .cover_photo_id
            .as_ref()
            .is_some_and(|cover| album.contains(cover));
        if !cover_valid {
            album.cover_photo_id = album.photo_ids.first().cloned();
        }
    }
    albums.retain(|album| !album.is_empty());

    *albums != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn photo(id: &str) -> Photo {
        Photo::new(id, format!("/media/{}.jpg", id), Utc::now())
    }

    #[test]
    fn test_append_rejects_duplicate_id() {
        let mut photos = vec![photo("a")];
        let result = append_photo(&mut photos, photo("a"));
        assert!(matches!(result, Err(GalleryError::DuplicateId(id)) if id == "a"));
        assert_eq!(photos.len(), 1);

        append_photo(&mut photos, photo("b")).unwrap();
        assert_eq!(photos.len(), 2);
    }

    #[test]
    fn test_modify_missing_photo() {
        let mut photos = vec![photo("a")];
        let result = modify_photo(&mut photos, "zzz", |p| p.favorite = true);
        assert!(result.unwrap_err().is_not_found());
        assert!(!photos[0].favorite);
    }

    #[test]
    fn test_modify_leaves_other_photos_untouched() {
        let mut photos = vec![photo("a"), photo("b")];
        let original_b = photos[1].clone();

        let updated = modify_photo(&mut photos, "a", |p| p.caption = "beach".to_string()).unwrap();

        assert_eq!(updated.caption, "beach");
        assert_eq!(photos[0], updated);
        assert_eq!(photos[1], original_b);
    }

    #[test]
    fn test_cascade_updates_and_removes() {
        let mut albums = vec![
            Album::new("1", "Trip", ids(&["a", "b"])),
            Album::new("2", "Solo", ids(&["a"])),
            Album::new("3", "Other", ids(&["c"])),
        ];

        let cascade = cascade_photo_removal(&mut albums, "a");

        assert_eq!(cascade.updated_albums, ids(&["1"]));
        assert_eq!(cascade.removed_albums, ids(&["2"]));
        assert!(cascade.changed());
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].photo_ids, ids(&["b"]));
        assert_eq!(albums[0].cover_photo_id.as_deref(), Some("b"));
        assert_eq!(albums[1].id, "3");
    }

    #[test]
    fn test_cascade_keeps_preexisting_empty_album() {
        // Only albums emptied by this removal are dropped
        let mut albums = vec![Album::new("1", "Empty", Vec::new())];
        let cascade = cascade_photo_removal(&mut albums, "a");
        assert!(!cascade.changed());
        assert_eq!(albums.len(), 1);
    }

    #[test]
    fn test_create_new_album() {
        let mut albums = Vec::new();
        let outcome = create_or_append(&mut albums, "  Trip ", &ids(&["a", "b", "a"]), || {
            "new".to_string()
        })
        .unwrap();

        let AlbumOutcome::Created(album) = outcome else {
            panic!("expected a created album");
        };
        assert_eq!(album.id, "new");
        assert_eq!(album.name, "Trip");
        assert_eq!(album.photo_ids, ids(&["a", "b"]));
        assert_eq!(album.cover_photo_id.as_deref(), Some("a"));
        assert_eq!(albums, vec![album]);
    }

    #[test]
    fn test_append_to_existing_case_insensitive() {
        let mut albums = vec![Album::new("1", "Trip", ids(&["a"]))];

        let outcome = create_or_append(&mut albums, "TRIP", &ids(&["a", "c", "b"]), || {
            panic!("must not create an album")
        })
        .unwrap();

        assert_eq!(
            outcome,
            AlbumOutcome::Appended {
                album: albums[0].clone(),
                added: ids(&["c", "b"]),
            }
        );
        assert_eq!(albums[0].photo_ids, ids(&["a", "c", "b"]));
        assert_eq!(albums[0].name, "Trip");
    }

    #[test]
    fn test_append_nothing_new_is_no_change() {
        let mut albums = vec![Album::new("1", "Trip", ids(&["a", "b"]))];
        let before = albums.clone();

        let outcome =
            create_or_append(&mut albums, "trip", &ids(&["b"]), || "x".to_string()).unwrap();

        assert!(matches!(outcome, AlbumOutcome::NoChange(_)));
        assert_eq!(albums, before);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let mut albums = Vec::new();

        let empty_name = create_or_append(&mut albums, "   ", &ids(&["a"]), || "x".to_string());
        assert!(matches!(empty_name, Err(GalleryError::InvalidInput(_))));

        let no_photos = create_or_append(&mut albums, "Trip", &[], || "x".to_string());
        assert!(matches!(no_photos, Err(GalleryError::InvalidInput(_))));
        assert!(albums.is_empty());
    }

    #[test]
    fn test_projection_follows_album_order() {
        let photos = vec![photo("a"), photo("b"), photo("c")];
        let album = Album::new("1", "Trip", ids(&["c", "missing", "a"]));

        let projected: Vec<String> = project_album_photos(&photos, &album)
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(projected, ids(&["c", "a"]));
    }

    #[test]
    fn test_audit_and_repair() {
        // GIVEN: Albums violating every integrity rule
        let photos = vec![photo("a"), photo("b")];
        let mut albums = vec![
            Album {
                id: "1".to_string(),
                name: "Broken".to_string(),
                photo_ids: ids(&["ghost", "a", "a", "b"]),
                cover_photo_id: Some("ghost".to_string()),
            },
            Album::new("2", "Gone", ids(&["ghost"])),
            Album::new("3", "Fine", ids(&["b"])),
        ];

        // WHEN: Auditing
        let report = audit(&photos, &albums);

        // THEN: Every violation is listed
        assert_eq!(report.dangling.len(), 2);
        assert_eq!(report.duplicate_entries.len(), 1);
        assert_eq!(report.duplicate_entries[0].photo_id, "a");
        assert_eq!(report.invalid_covers, ids(&["1", "2"]));
        assert!(report.empty_albums.is_empty());
        assert!(!report.is_clean());

        // WHEN: Repairing
        assert!(repair(&photos, &mut albums));

        // THEN: The albums are consistent again
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].photo_ids, ids(&["a", "b"]));
        assert_eq!(albums[0].cover_photo_id.as_deref(), Some("a"));
        assert_eq!(albums[1].id, "3");
        assert!(audit(&photos, &albums).is_clean());
        assert!(!repair(&photos, &mut albums));
    }
}
