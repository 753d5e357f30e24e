//! In-memory document store, mainly for tests and embedding.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::traits::DocumentStore;

/// Document store backed by a `HashMap` protected by `RwLock`.
///
/// Every write replaces the whole document. [`commits`](Self::commits)
/// counts acknowledged writes so tests can observe coalescing.
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<String, Value>>,
    commits: RwLock<u64>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            commits: RwLock::new(0),
        }
    }

    /// Create a store pre-seeded with documents.
    pub fn with_documents(docs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            docs: RwLock::new(docs.into_iter().collect()),
            commits: RwLock::new(0),
        }
    }

    /// Number of writes acknowledged so far.
    pub async fn commits(&self) -> u64 {
        *self.commits.read().await
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.docs.read().await.contains_key(key))
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.docs.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, document: &Value) -> Result<(), StoreError> {
        self.docs
            .write()
            .await
            .insert(key.to_string(), document.clone());
        *self.commits.write().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_then_read() {
        let store = InMemoryDocumentStore::new();
        store
            .write("triggers.json", &json!({"triggers": []}))
            .await
            .unwrap();
        assert!(store.exists("triggers.json").await.unwrap());
        assert_eq!(
            store.read("triggers.json").await.unwrap(),
            Some(json!({"triggers": []}))
        );
        assert_eq!(store.commits().await, 1);
    }

    #[tokio::test]
    async fn test_read_missing() {
        let store = InMemoryDocumentStore::new();
        assert!(!store.exists("events.json").await.unwrap());
        assert_eq!(store.read("events.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_overwrites_whole_document() {
        let store = InMemoryDocumentStore::with_documents([(
            "doc".to_string(),
            json!({"a": 1, "b": 2}),
        )]);
        store.write("doc", &json!({"a": 3})).await.unwrap();
        assert_eq!(store.read("doc").await.unwrap(), Some(json!({"a": 3})));
    }
}
