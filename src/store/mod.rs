//! Collection Store Adapter
//!
//! Persists the photo and album collections as whole JSON arrays, one key per
//! collection, in an injected [`KeyValueStore`] backend:
//! - [`MemoryStore`] for tests and throwaway sessions
//! - [`JsonFileStore`] for one JSON file per collection
//! - [`SqliteStore`] for a single SQLite table with transactional batches
//!
//! Every save replaces the complete collection. Callers must load, transform
//! and save the whole snapshot under the collection lock.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Album, Photo};

pub mod file;
pub mod memory;
pub mod sqlite;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// The named collections. Declaration order is the lock acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Photos,
    Albums,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Photos, Collection::Albums];

    pub fn key(self) -> &'static str {
        match self {
            Collection::Photos => "photos",
            Collection::Albums => "albums",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Collection::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A record type persisted as one collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
}

impl Record for Photo {
    const COLLECTION: Collection = Collection::Photos;
}

impl Record for Album {
    const COLLECTION: Collection = Collection::Albums;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A multi-key write that stopped at `failed`. Keys in `written` were
/// persisted before the failure.
#[derive(Debug, thiserror::Error)]
#[error("Failed to write '{failed}' after writing {written:?}: {source}")]
pub struct BatchWriteError {
    pub written: Vec<String>,
    pub failed: String,
    #[source]
    pub source: StoreError,
}

/// Durable mapping from key to serialized value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    /// Whether `set_many` commits all entries or none.
    fn atomic_batches(&self) -> bool {
        false
    }

    /// Writes entries in order, stopping at the first failure.
    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), BatchWriteError> {
        let mut written = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if let Err(source) = self.set(&key, value).await {
                return Err(BatchWriteError {
                    written,
                    failed: key,
                    source,
                });
            }
            written.push(key);
        }
        Ok(())
    }
}

/// Typed load/save of whole collections on top of a backend.
#[derive(Clone)]
pub struct CollectionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CollectionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn atomic_batches(&self) -> bool {
        self.backend.atomic_batches()
    }

    /// Returns the persisted collection, or an empty one if never saved.
    pub async fn load<T: Record>(&self) -> StoreResult<Vec<T>> {
        let key = T::COLLECTION.key();
        match self.backend.get(key).await? {
            Some(raw) => {
                let records: Vec<T> = serde_json::from_str(&raw)?;
                log::debug!(
                    "Loaded {} records from '{}' ({})",
                    records.len(),
                    key,
                    self.backend.name()
                );
                Ok(records)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Replaces the persisted collection with `records`.
    pub async fn save<T: Record>(&self, records: &[T]) -> StoreResult<()> {
        let key = T::COLLECTION.key();
        let body = serde_json::to_string(records)?;
        self.backend.set(key, body).await?;
        log::debug!("Saved {} records to '{}'", records.len(), key);
        Ok(())
    }

    /// Replaces both collections, photos first.
    pub async fn save_both(&self, photos: &[Photo], albums: &[Album]) -> Result<(), BatchWriteError> {
        let entries = vec![
            (
                Collection::Photos.key().to_string(),
                encode(Collection::Photos, photos)?,
            ),
            (
                Collection::Albums.key().to_string(),
                encode(Collection::Albums, albums)?,
            ),
        ];
        self.backend.set_many(entries).await
    }
}

fn encode<T: Serialize>(collection: Collection, records: &[T]) -> Result<String, BatchWriteError> {
    serde_json::to_string(records).map_err(|e| BatchWriteError {
        written: Vec::new(),
        failed: collection.key().to_string(),
        source: e.into(),
    })
}
