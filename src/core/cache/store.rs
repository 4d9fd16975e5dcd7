use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use super::model::{CacheDocument, CacheEntry};
use crate::core::error::{ModError, ModResult};

/// Fields recorded after a successful fetch.
#[derive(Debug, Clone)]
pub struct DownloadRecord {
    pub mod_id: u64,
    pub mod_name: String,
    pub latest_version_id: u64,
    pub latest_version_number: Option<String>,
    pub file_name: String,
    pub file_size: Option<u64>,
}

/// Write-through reconciliation cache.
///
/// The whole document is read once at startup and rewritten after each
/// mutation, so an interrupted run never loses more than the in-flight
/// operation. Access is single-threaded by design — batches are
/// processed strictly sequentially — so no locking is needed.
pub struct ModCache {
    path: PathBuf,
    doc: CacheDocument,
}

impl ModCache {
    /// Load the cache, degrading to an empty document on a missing or
    /// corrupt file so a damaged local state never blocks the pipeline.
    pub async fn load(path: PathBuf) -> Self {
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<CacheDocument>(&raw) {
                Ok(doc) => doc,
                Err(err) => {
                    warn!("Corrupt cache at {:?}: {} — starting empty", path, err);
                    CacheDocument::default()
                }
            },
            Err(_) => CacheDocument::default(),
        };
        Self { path, doc }
    }

    pub fn entry(&self, mod_id: u64) -> Option<&CacheEntry> {
        self.doc.mods.get(&mod_id.to_string())
    }

    /// True exactly when an entry exists, its recorded latest version id
    /// equals the newly resolved one, and no force override is in play.
    /// This is the at-most-once-per-version download guarantee.
    pub fn should_skip_download(&self, mod_id: u64, latest_version_id: u64, force: bool) -> bool {
        if force {
            return false;
        }
        self.entry(mod_id)
            .is_some_and(|entry| entry.latest_version_id == latest_version_id)
    }

    /// True when, additionally, the recorded install matches the latest
    /// version and the installed path still exists as a directory.
    pub fn should_skip_install(&self, mod_id: u64, latest_version_id: u64, force: bool) -> bool {
        if !self.should_skip_download(mod_id, latest_version_id, force) {
            return false;
        }
        self.entry(mod_id).is_some_and(|entry| {
            entry.installed_version_id == Some(latest_version_id)
                && entry
                    .installed_path
                    .as_deref()
                    .is_some_and(Path::is_dir)
        })
    }

    /// Merge a download record (create-or-update) and persist immediately.
    /// Install bookkeeping on an existing entry is preserved.
    pub async fn record_download(&mut self, record: DownloadRecord) -> ModResult<()> {
        let key = record.mod_id.to_string();
        let previous = self.doc.mods.get(&key);
        let entry = CacheEntry {
            mod_id: record.mod_id,
            mod_name: record.mod_name,
            latest_version_id: record.latest_version_id,
            latest_version_number: record.latest_version_number,
            file_name: record.file_name,
            file_size: record.file_size,
            download_date: Utc::now(),
            installed_version_id: previous.and_then(|e| e.installed_version_id),
            installed_path: previous.and_then(|e| e.installed_path.clone()),
        };
        self.doc.mods.insert(key, entry);
        self.save().await
    }

    /// Mark the entry's just-fetched version as installed at `path` and
    /// persist immediately.
    pub async fn record_install(&mut self, mod_id: u64, installed_path: &Path) -> ModResult<()> {
        let key = mod_id.to_string();
        let Some(entry) = self.doc.mods.get_mut(&key) else {
            return Err(ModError::Other(format!(
                "no cache entry for mod {} to record install against",
                mod_id
            )));
        };
        entry.installed_version_id = Some(entry.latest_version_id);
        entry.installed_path = Some(installed_path.to_path_buf());
        self.save().await
    }

    async fn save(&self) -> ModResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ModError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let json = serde_json::to_string_pretty(&self.doc)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| ModError::Io {
                path: self.path.clone(),
                source,
            })?;
        info!("Cache persisted to {:?}", self.path);
        Ok(())
    }
}
