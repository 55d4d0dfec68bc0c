use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::Collection;

/// One async mutex per collection.
///
/// A load-modify-save cycle holds the guard of every collection it touches
/// until the save completes. Guards are always taken in `Collection` order,
/// so two operations needing both collections cannot deadlock.
#[derive(Clone)]
pub struct CollectionLocks {
    locks: Arc<BTreeMap<Collection, Arc<Mutex<()>>>>,
}

/// Guards held for the duration of one mutation. Dropping releases them.
#[must_use = "collections are unlocked as soon as the guard is dropped"]
pub struct CollectionGuard {
    held: Vec<(Collection, OwnedMutexGuard<()>)>,
}

impl CollectionGuard {
    pub fn holds(&self, collection: Collection) -> bool {
        self.held.iter().any(|(c, _)| *c == collection)
    }
}

impl CollectionLocks {
    pub fn new() -> Self {
        let locks: BTreeMap<Collection, Arc<Mutex<()>>> = Collection::ALL
            .iter()
            .map(|c| (*c, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            locks: Arc::new(locks),
        }
    }

    pub async fn acquire(&self, collections: &[Collection]) -> CollectionGuard {
        let mut wanted = collections.to_vec();
        wanted.sort();
        wanted.dedup();

        let mut held = Vec::with_capacity(wanted.len());
        for collection in wanted {
            if let Some(lock) = self.locks.get(&collection) {
                held.push((collection, lock.clone().lock_owned().await));
            }
        }

        CollectionGuard { held }
    }
}

impl Default for CollectionLocks {
    fn default() -> Self {
        Self::new()
    }
}

type LockTable = Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// One async mutex per record id, created on first use and dropped again
/// once nobody holds or waits for it.
///
/// Serialises work on a single photo that spans more than one coordinator
/// call, such as reading a uri, editing the file and swapping the uri.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    table: LockTable,
}

#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyedGuard {
    key: String,
    table: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> KeyedGuard {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        KeyedGuard {
            key: key.to_string(),
            table: self.table.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of keys currently locked or waited on.
    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        self.guard.take();

        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        // Only the table itself still references an idle lock
        let idle = table
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            table.remove(&self.key);
        }
    }
}
