use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A captured photo. `id` and `created_at` never change after capture; edits
/// replace `uri` and the user-editable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub uri: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub favorite: bool,
}

impl Photo {
    pub fn new(id: impl Into<String>, uri: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            created_at,
            caption: String::new(),
            favorite: false,
        }
    }
}

/// Partial update of a photo. Unset fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPatch {
    pub caption: Option<String>,
    pub favorite: Option<bool>,
    pub uri: Option<String>,
}

impl PhotoPatch {
    pub fn caption(caption: impl Into<String>) -> Self {
        Self {
            caption: Some(caption.into()),
            ..Default::default()
        }
    }

    pub fn favorite(favorite: bool) -> Self {
        Self {
            favorite: Some(favorite),
            ..Default::default()
        }
    }

    pub fn uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.caption.is_none() && self.favorite.is_none() && self.uri.is_none()
    }

    pub fn apply(&self, photo: &mut Photo) {
        if let Some(caption) = &self.caption {
            photo.caption = caption.clone();
        }
        if let Some(favorite) = self.favorite {
            photo.favorite = favorite;
        }
        if let Some(uri) = &self.uri {
            photo.uri = uri.clone();
        }
    }
}

/// A named, ordered group of photo ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub photo_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_photo_id: Option<String>,
}

impl Album {
    /// Creates an album whose cover is the first photo id.
    pub fn new(id: impl Into<String>, name: impl Into<String>, photo_ids: Vec<String>) -> Self {
        let cover_photo_id = photo_ids.first().cloned();
        Self {
            id: id.into(),
            name: name.into(),
            photo_ids,
            cover_photo_id,
        }
    }

    pub fn contains(&self, photo_id: &str) -> bool {
        self.photo_ids.iter().any(|id| id == photo_id)
    }

    pub fn is_empty(&self) -> bool {
        self.photo_ids.is_empty()
    }

    /// Case-insensitive comparison, ignoring surrounding whitespace.
    pub fn name_matches(&self, name: &str) -> bool {
        normalize_name(&self.name) == normalize_name(name)
    }

    /// Removes every occurrence of `photo_id`. If it was the cover, the cover
    /// moves to the first remaining photo or is cleared.
    pub fn remove_photo(&mut self, photo_id: &str) -> bool {
        let before = self.photo_ids.len();
        self.photo_ids.retain(|id| id != photo_id);
        let removed = self.photo_ids.len() != before;

        if self.cover_photo_id.as_deref() == Some(photo_id) {
            self.cover_photo_id = self.photo_ids.first().cloned();
        }

        removed
    }

    /// Appends the ids not yet present, in the given order, and returns them.
    /// An album without a cover gets its first photo as cover once it grows.
    pub fn append_photos(&mut self, photo_ids: &[String]) -> Vec<String> {
        let mut added = Vec::new();
        for id in photo_ids {
            if !self.contains(id) {
                self.photo_ids.push(id.clone());
                added.push(id.clone());
            }
        }

        if !added.is_empty() && self.cover_photo_id.is_none() {
            self.cover_photo_id = self.photo_ids.first().cloned();
        }

        added
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
