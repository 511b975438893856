//! Asset source file cache
//!
//! Asset payloads (data URLs) are too large to repeat in every snapshot, so
//! they are stored once per asset id and re-attached after a project is
//! rebuilt from its records.

use crate::error::Result;
use crate::model::{ObjectId, Project};
use crate::store::KeyValueStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves binary asset payloads by asset id.
#[async_trait]
pub trait FileCache: Send + Sync {
    /// Persist the payload of every asset that has one
    async fn store_files(&self, project: &Project) -> Result<()>;

    /// Attach cached payloads to the project's assets.
    ///
    /// Assets without a cached payload keep `src = None`.
    async fn load_files(&self, project: &mut Project) -> Result<()>;

    /// Ids of every asset with a cached payload
    async fn cached_ids(&self) -> Result<Vec<ObjectId>>;

    /// Drop the payload for `id`; a missing payload is not an error
    async fn remove_file(&self, id: ObjectId) -> Result<()>;
}

/// File cache sharing the autosave key-value store.
///
/// Payloads are immutable per asset id, so an existing entry is never
/// rewritten.
pub struct StoreFileCache {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl StoreFileCache {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn key(&self, id: ObjectId) -> String {
        format!("{}{}", self.prefix, id)
    }
}

#[async_trait]
impl FileCache for StoreFileCache {
    async fn store_files(&self, project: &Project) -> Result<()> {
        for asset in &project.assets {
            let Some(src) = &asset.src else {
                continue;
            };
            let key = self.key(asset.id);
            if self.store.get_item(&key).await?.is_some() {
                continue;
            }
            self.store.set_item(&key, serde_json::to_string(src)?).await?;
            tracing::debug!(asset = %asset.id, filename = %asset.filename, "Cached asset source");
        }
        Ok(())
    }

    async fn load_files(&self, project: &mut Project) -> Result<()> {
        for asset in &mut project.assets {
            match self.store.get_item(&self.key(asset.id)).await? {
                Some(raw) => asset.src = Some(serde_json::from_str(&raw)?),
                None => {
                    tracing::warn!(
                        project = %project.id,
                        asset = %asset.id,
                        filename = %asset.filename,
                        "No cached source for asset"
                    );
                }
            }
        }
        Ok(())
    }

    async fn cached_ids(&self) -> Result<Vec<ObjectId>> {
        let ids = self
            .store
            .keys()
            .await?
            .iter()
            .filter_map(|key| key.strip_prefix(&self.prefix))
            .filter_map(|suffix| match suffix.parse::<ObjectId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(suffix, "Ignoring file key without an asset id");
                    None
                }
            })
            .collect();
        Ok(ids)
    }

    async fn remove_file(&self, id: ObjectId) -> Result<()> {
        self.store.remove_item(&self.key(id)).await?;
        tracing::debug!(asset = %id, "Removed cached asset source");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, AssetKind};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_store_and_load_files() {
        let store = Arc::new(MemoryStore::new());
        let cache = StoreFileCache::new(store.clone(), "filesrc_");

        let mut project = Project::new("Files");
        project.add_asset(Asset::new(AssetKind::Image, "a.png", Some("data:image/png;base64,AA".into())));
        project.add_asset(Asset::new(AssetKind::Sound, "b.wav", None));
        cache.store_files(&project).await.unwrap();
        assert_eq!(store.len().await, 1);

        let expected = project.assets[0].src.clone();
        for asset in &mut project.assets {
            asset.src = None;
        }
        cache.load_files(&mut project).await.unwrap();

        assert_eq!(project.assets[0].src, expected);
        assert!(project.assets[1].src.is_none());
    }

    #[tokio::test]
    async fn test_existing_payload_is_not_rewritten() {
        let store = Arc::new(MemoryStore::new());
        let cache = StoreFileCache::new(store.clone(), "filesrc_");

        let mut project = Project::new("Files");
        project.add_asset(Asset::new(AssetKind::Image, "a.png", Some("first".into())));
        cache.store_files(&project).await.unwrap();

        project.assets[0].src = Some("second".into());
        cache.store_files(&project).await.unwrap();

        let key = format!("filesrc_{}", project.assets[0].id);
        assert_eq!(store.get_item(&key).await.unwrap().as_deref(), Some("\"first\""));
    }

    #[tokio::test]
    async fn test_cached_ids_and_remove_file() {
        let store = Arc::new(MemoryStore::new());
        let cache = StoreFileCache::new(store.clone(), "filesrc_");
        store.set_item("filesrc_not-a-uuid", "\"x\"".into()).await.unwrap();
        store.set_item("autosave_other", "{}".into()).await.unwrap();

        let mut project = Project::new("Files");
        project.add_asset(Asset::new(AssetKind::Image, "a.png", Some("data:a".into())));
        cache.store_files(&project).await.unwrap();
        let id = project.assets[0].id;

        assert_eq!(cache.cached_ids().await.unwrap(), vec![id]);

        cache.remove_file(id).await.unwrap();
        assert!(cache.cached_ids().await.unwrap().is_empty());
        cache.remove_file(id).await.unwrap();
        assert_eq!(store.len().await, 2);
    }
}
