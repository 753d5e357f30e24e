//! File-system backed document store.
//!
//! Layout:
//! ```text
//! {base_dir}/{key}     one JSON document per key, e.g. triggers.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
use crate::traits::DocumentStore;

/// Stores each document as a pretty-printed JSON file under `base_dir`.
///
/// Writes go to a temp file that is then renamed over the target, so a
/// reader never sees a half-written document.
pub struct FileDocumentStore {
    base_dir: PathBuf,
}

impl FileDocumentStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&base_dir).map_err(|e| StoreError::Store {
            message: format!("failed to create store directory: {e}"),
        })?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(StoreError::Store {
                message: format!("invalid document key: {key}"),
            });
        }
        Ok(self.base_dir.join(key))
    }
}

/// Atomic write: write to a temp file, then rename over the target.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    std::fs::write(&temp_path, data).map_err(|e| StoreError::Store {
        message: format!("failed to write temp file: {e}"),
    })?;
    std::fs::rename(&temp_path, path).map_err(|e| StoreError::Store {
        message: format!("failed to rename temp file: {e}"),
    })?;
    Ok(())
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(key)?.exists())
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(&path).map_err(|e| StoreError::Store {
            message: format!("failed to read {key}: {e}"),
        })?;
        let doc = serde_json::from_slice(&data).map_err(|e| StoreError::Store {
            message: format!("failed to parse {key}: {e}"),
        })?;
        Ok(Some(doc))
    }

    async fn write(&self, key: &str, document: &Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let data = serde_json::to_vec_pretty(document).map_err(|e| StoreError::Store {
            message: format!("failed to serialize {key}: {e}"),
        })?;
        atomic_write(&path, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf()).unwrap();

        let doc = json!({"events": [{"id": "evt_1"}]});
        store.write("events.json", &doc).await.unwrap();

        assert!(dir.path().join("events.json").exists());
        assert!(!dir.path().join("events.json.tmp").exists());
        assert_eq!(store.read("events.json").await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf()).unwrap();
        assert!(!store.exists("triggers.json").await.unwrap());
        assert_eq!(store.read("triggers.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf()).unwrap();
        assert!(store.write("../escape.json", &json!({})).await.is_err());
        assert!(store.read("nested/doc.json").await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_store_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("triggers.json"), b"{not json").unwrap();
        let store = FileDocumentStore::new(dir.path().to_path_buf()).unwrap();
        let err = store.read("triggers.json").await.unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
