use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{KeyValueStore, StoreResult};

/// One `<key>.json` file per collection in a directory.
///
/// Writes go to a temporary sibling first and are renamed over the target,
/// so a reader sees either the previous or the new collection, never a
/// truncated one. Batches are written key by key.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        log::info!("Collection files in {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    fn name(&self) -> &'static str {
        "json-file"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let target = self.path_for(key);
        let temp_path = target.with_extension("json.tmp");

        tokio::fs::write(&temp_path, value).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &target).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_as_unset() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp_dir.path()).await.unwrap();

        assert!(store.get("photos").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_file_without_leftovers() {
        // GIVEN: A store in a fresh nested directory
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("collections");
        let store = JsonFileStore::open(&dir).await.unwrap();

        // WHEN: Writing the same key twice
        store.set("photos", "[1]".to_string()).await.unwrap();
        store.set("photos", "[1,2]".to_string()).await.unwrap();

        // THEN: Latest value wins and no temp file remains
        assert_eq!(store.get("photos").await.unwrap().as_deref(), Some("[1,2]"));
        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["photos.json".to_string()]);
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = JsonFileStore::open(temp_dir.path()).await.unwrap();
            store.set("albums", "[]".to_string()).await.unwrap();
        }

        let reopened = JsonFileStore::open(temp_dir.path()).await.unwrap();
        assert_eq!(reopened.get("albums").await.unwrap().as_deref(), Some("[]"));
        assert!(!reopened.atomic_batches());
    }
}
