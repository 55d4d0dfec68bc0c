use crate::media::MediaError;
use crate::store::{Collection, StoreError};

/// Classified result of every coordinator and gallery operation.
///
/// Raw backend failures never reach callers unwrapped: they arrive as
/// `StoreUnavailable` (nothing was written) or `PartialWriteFailure` (one
/// collection was written, the other was not).
#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("Collection '{collection}' unavailable: {source}")]
    StoreUnavailable {
        collection: Collection,
        #[source]
        source: StoreError,
    },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("Photo id already exists: {0}")]
    DuplicateId(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Partial write: '{written}' saved but '{failed}' failed: {source}")]
    PartialWriteFailure {
        written: Collection,
        failed: Collection,
        #[source]
        source: StoreError,
    },
    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

impl GalleryError {
    pub fn photo_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "Photo",
            id: id.to_string(),
        }
    }

    pub fn album_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "Album",
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type GalleryResult<T> = Result<T, GalleryError>;
