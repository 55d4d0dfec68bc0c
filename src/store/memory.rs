use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{BatchWriteError, KeyValueStore, StoreError, StoreResult};

/// Process-local backend. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn atomic_batches(&self) -> bool {
        true
    }

    async fn set_many(&self, batch: Vec<(String, String)>) -> Result<(), BatchWriteError> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => {
                return Err(BatchWriteError {
                    written: Vec::new(),
                    failed: batch.first().map(|(k, _)| k.clone()).unwrap_or_default(),
                    source: StoreError::LockPoisoned,
                })
            }
        };
        entries.extend(batch);
        Ok(())
    }
}
