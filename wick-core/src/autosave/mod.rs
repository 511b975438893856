//! Autosave persistence
//!
//! Keeps recoverable copies of open projects in a [`KeyValueStore`]:
//!
//! ```text
//! autosaveList            -> [{id, lastModified}, ...]      (the index)
//! autosave_<project id>   -> {projectId, projectState,      (one snapshot
//!                             objectStates, lastModified}     per project)
//! filesrc_<asset id>      -> "data:..."                     (asset payloads)
//! ```
//!
//! ## Write ordering
//!
//! The store has no multi-key transactions, so the order of writes decides
//! what a crash can leave behind:
//!
//! - `save` writes asset payloads, then the snapshot, then the index entry.
//! - `delete` removes the index entry, then the snapshot, then any asset
//!   payload no remaining snapshot references.
//!
//! The index therefore never names a snapshot that does not exist. The only
//! possible residue is an orphaned snapshot or payload, which
//! [`AutoSave::repair`] reclaims.
//!
//! Callers must not run two operations on the same project id concurrently,
//! and must not run `repair` alongside a `save`.

mod files;

pub use files::{FileCache, StoreFileCache};

use crate::config::AutosaveConfig;
use crate::error::{Error, Result};
use crate::model::{ObjectId, ObjectRecord, Project, ProjectData, ProjectRecord};
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One entry of the autosave index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveEntry {
    #[serde(alias = "uuid")]
    pub id: ObjectId,
    pub last_modified: DateTime<Utc>,
}

/// A complete, self-contained copy of a project.
///
/// `object_states` holds every object owned by the project; `project_state`
/// references them by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveSnapshot {
    pub project_id: ObjectId,
    pub project_state: ProjectRecord,
    pub object_states: Vec<ObjectRecord>,
    pub last_modified: DateTime<Utc>,
}

impl AutosaveSnapshot {
    /// Capture a project and everything it owns
    pub fn from_project(project: &Project) -> Self {
        let ProjectData { project: record, objects } = project.serialize();
        Self {
            project_id: project.id,
            last_modified: record.metadata.last_modified,
            project_state: record,
            object_states: objects,
        }
    }

    /// Materialize the snapshot's objects, then rebuild the project from them
    pub fn restore(&self) -> Result<Project> {
        if self.project_state.uuid != self.project_id {
            return Err(Error::Corrupt {
                id: self.project_id,
                message: format!(
                    "snapshot holds project {} instead",
                    self.project_state.uuid
                ),
            });
        }
        let cache = crate::model::ObjectCache::from_records(self.object_states.iter().cloned())?;
        cache.build_project(&self.project_state)
    }
}

/// Outcome of [`AutoSave::repair`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepairReport {
    /// Index entries removed because their snapshot was missing
    pub dangling_entries: Vec<ObjectId>,
    /// Snapshots removed because no index entry named them
    pub orphaned_snapshots: Vec<ObjectId>,
    /// Index entries dropped as duplicates of another entry for the same id
    pub duplicates_collapsed: usize,
    /// Cached asset payloads removed because no snapshot references them
    pub orphaned_files: Vec<ObjectId>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_entries.is_empty()
            && self.orphaned_snapshots.is_empty()
            && self.duplicates_collapsed == 0
            && self.orphaned_files.is_empty()
    }
}

/// Autosave manager.
///
/// Cheap to share behind an `Arc`; holds no state besides its handles.
pub struct AutoSave {
    store: Arc<dyn KeyValueStore>,
    files: Arc<dyn FileCache>,
    config: AutosaveConfig,
}

impl AutoSave {
    /// Create a manager whose file cache shares the same store
    pub fn new(store: Arc<dyn KeyValueStore>, config: AutosaveConfig) -> Self {
        let files: Arc<dyn FileCache> =
            Arc::new(StoreFileCache::new(store.clone(), config.file_prefix.clone()));
        Self {
            store,
            files,
            config,
        }
    }

    /// Create a manager with a custom file cache
    pub fn with_file_cache(
        store: Arc<dyn KeyValueStore>,
        files: Arc<dyn FileCache>,
        config: AutosaveConfig,
    ) -> Self {
        Self {
            store,
            files,
            config,
        }
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    fn snapshot_key(&self, id: ObjectId) -> String {
        format!("{}{}", self.config.data_prefix, id)
    }

    // ============================================
    // Public operations
    // ============================================

    /// Save a snapshot of `project`, replacing any earlier one.
    pub async fn save(&self, project: &Project) -> Result<AutosaveEntry> {
        let snapshot = AutosaveSnapshot::from_project(project);
        let entry = AutosaveEntry {
            id: project.id,
            last_modified: snapshot.last_modified,
        };

        self.files.store_files(project).await?;

        let body = serde_json::to_string(&snapshot)?;
        self.store
            .set_item(&self.snapshot_key(project.id), body)
            .await?;

        let mut index = self.read_index().await?;
        match index.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => existing.last_modified = entry.last_modified,
            None => index.push(entry.clone()),
        }
        self.write_index(&index).await?;

        tracing::info!(
            project = %project.id,
            objects = snapshot.object_states.len(),
            last_modified = %entry.last_modified,
            "Autosaved project"
        );
        Ok(entry)
    }

    /// Rebuild the autosaved project with the given id.
    pub async fn load(&self, id: ObjectId) -> Result<Project> {
        let snapshot = self.snapshot(id).await?;
        let mut project = snapshot.restore()?;
        self.files.load_files(&mut project).await?;

        tracing::info!(
            project = %id,
            objects = snapshot.object_states.len(),
            "Loaded autosaved project"
        );
        Ok(project)
    }

    /// Remove the index entry and snapshot for `id`, then the cached
    /// payloads of its assets unless another snapshot still uses them.
    ///
    /// Deleting an id that has no autosave is not an error.
    pub async fn delete(&self, id: ObjectId) -> Result<()> {
        let assets = match self.store.get_item(&self.snapshot_key(id)).await? {
            Some(raw) => match serde_json::from_str::<AutosaveSnapshot>(&raw) {
                Ok(snapshot) => snapshot.project_state.assets,
                Err(e) => {
                    tracing::warn!(project = %id, error = %e, "Unreadable snapshot, keeping its files");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let mut index = self.read_index().await?;
        let before = index.len();
        index.retain(|e| e.id != id);
        if index.len() != before {
            self.write_index(&index).await?;
        }

        self.store.remove_item(&self.snapshot_key(id)).await?;

        if !assets.is_empty() {
            if let Some(live) = self.live_asset_ids().await? {
                for asset in assets.into_iter().filter(|a| !live.contains(a)) {
                    self.files.remove_file(asset).await?;
                }
            }
        }

        tracing::info!(project = %id, "Deleted autosave");
        Ok(())
    }

    /// Index entries, most recently modified first.
    pub async fn list(&self) -> Result<Vec<AutosaveEntry>> {
        self.read_index().await
    }

    /// Whether a snapshot exists for `id`
    pub async fn contains(&self, id: ObjectId) -> Result<bool> {
        Ok(self.store.get_item(&self.snapshot_key(id)).await?.is_some())
    }

    /// Read the raw snapshot for `id`
    pub async fn snapshot(&self, id: ObjectId) -> Result<AutosaveSnapshot> {
        let raw = self
            .store
            .get_item(&self.snapshot_key(id))
            .await?
            .ok_or(Error::NotFound(id))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Bring the index and snapshots back into agreement.
    ///
    /// Drops index entries whose snapshot is gone, snapshots no entry names,
    /// duplicate entries left by clients that appended instead of updating,
    /// and cached asset payloads that no remaining snapshot references.
    pub async fn repair(&self) -> Result<RepairReport> {
        let mut report = RepairReport::default();

        let snapshot_ids: HashSet<ObjectId> = self
            .store
            .keys()
            .await?
            .iter()
            .filter_map(|key| key.strip_prefix(&self.config.data_prefix))
            .filter_map(|suffix| match suffix.parse::<ObjectId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(suffix, "Ignoring snapshot key without a project id");
                    None
                }
            })
            .collect();

        let raw = self.read_raw_index().await?;
        let raw_len = raw.len();
        let mut index = collapse(raw);
        report.duplicates_collapsed = raw_len - index.len();

        index.retain(|entry| {
            let keep = snapshot_ids.contains(&entry.id);
            if !keep {
                report.dangling_entries.push(entry.id);
            }
            keep
        });

        if !report.dangling_entries.is_empty() || report.duplicates_collapsed > 0 {
            self.write_index(&index).await?;
        }

        let indexed: HashSet<ObjectId> = index.iter().map(|e| e.id).collect();
        for id in snapshot_ids {
            if !indexed.contains(&id) {
                self.store.remove_item(&self.snapshot_key(id)).await?;
                report.orphaned_snapshots.push(id);
            }
        }

        match self.live_asset_ids().await? {
            Some(live) => {
                for asset in self.files.cached_ids().await? {
                    if !live.contains(&asset) {
                        self.files.remove_file(asset).await?;
                        report.orphaned_files.push(asset);
                    }
                }
            }
            None => tracing::warn!("Skipping file cleanup, a snapshot is unreadable"),
        }

        if report.is_clean() {
            tracing::debug!("Autosave index consistent");
        } else {
            tracing::warn!(
                dangling = report.dangling_entries.len(),
                orphaned = report.orphaned_snapshots.len(),
                duplicates = report.duplicates_collapsed,
                files = report.orphaned_files.len(),
                "Repaired autosave index"
            );
        }
        Ok(report)
    }

    /// Asset ids referenced by any stored snapshot.
    ///
    /// `None` if some snapshot cannot be parsed, since its assets are unknown.
    async fn live_asset_ids(&self) -> Result<Option<HashSet<ObjectId>>> {
        let mut live = HashSet::new();
        for key in self.store.keys().await? {
            let is_snapshot = key
                .strip_prefix(&self.config.data_prefix)
                .is_some_and(|suffix| suffix.parse::<ObjectId>().is_ok());
            if !is_snapshot {
                continue;
            }
            let Some(raw) = self.store.get_item(&key).await? else {
                continue;
            };
            match serde_json::from_str::<AutosaveSnapshot>(&raw) {
                Ok(snapshot) => live.extend(snapshot.project_state.assets),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Unreadable snapshot");
                    return Ok(None);
                }
            }
        }
        Ok(Some(live))
    }

    // ============================================
    // Index helpers
    // ============================================

    async fn read_raw_index(&self) -> Result<Vec<AutosaveEntry>> {
        match self.store.get_item(&self.config.index_key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Read the index with one entry per id, sorted by `last_modified` descending
    async fn read_index(&self) -> Result<Vec<AutosaveEntry>> {
        Ok(collapse(self.read_raw_index().await?))
    }

    async fn write_index(&self, entries: &[AutosaveEntry]) -> Result<()> {
        self.store
            .set_item(&self.config.index_key, serde_json::to_string(entries)?)
            .await
    }
}

/// Keep the newest entry per id and sort newest first
fn collapse(entries: Vec<AutosaveEntry>) -> Vec<AutosaveEntry> {
    let mut newest: HashMap<ObjectId, AutosaveEntry> = HashMap::new();
    for entry in entries {
        match newest.get(&entry.id) {
            Some(existing) if existing.last_modified >= entry.last_modified => {}
            _ => {
                newest.insert(entry.id, entry);
            }
        }
    }
    let mut list: Vec<AutosaveEntry> = newest.into_values().collect();
    list.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    list
}
