//! Key-value storage backends
//!
//! The autosave manager and file cache only need four operations, modelled
//! on browser storage: get, set, remove, and list keys. Values are JSON text.
//!
//! - [`MemoryStore`]: process-local map, for tests and embedding
//! - [`SqliteStore`]: durable single-table SQLite store

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Asynchronous key-value store.
///
/// Each call completes or fails on its own; there are no multi-key
/// transactions. A successful `set_item` or `remove_item` is durable for the
/// backend's notion of durability by the time it returns.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, or `None` if the key is absent
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    async fn set_item(&self, key: &str, value: String) -> Result<()>;

    /// Remove a value; removing an absent key is not an error
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys currently stored, in no particular order
    async fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic_operations() {
        let store = MemoryStore::new();
        assert!(store.get_item("a").await.unwrap().is_none());

        store.set_item("a", "1".to_string()).await.unwrap();
        store.set_item("a", "2".to_string()).await.unwrap();
        assert_eq!(store.get_item("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len().await, 1);

        store.remove_item("a").await.unwrap();
        store.remove_item("a").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_keys() {
        let store = MemoryStore::new();
        store.set_item("x", "{}".to_string()).await.unwrap();
        store.set_item("y", "{}".to_string()).await.unwrap();

        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
    }
}
