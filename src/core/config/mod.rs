// ─── Persisted credential config ───

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{ModError, ModResult};

const APP_DIR_NAME: &str = "modiodirect";
const CONFIG_FILE_NAME: &str = "config.json";

/// Single JSON document holding the mod.io API key.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: String,
}

impl ApiConfig {
    /// Best-effort load: a missing or corrupt config degrades to the
    /// default so the pipeline stays available.
    pub async fn load(path: &Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("Corrupt config at {:?}: {} — using defaults", path, err);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub async fn save(&self, path: &Path) -> ModResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ModError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| ModError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Platform config location, e.g. `~/.config/modiodirect/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Default download directory: `<Downloads>/modiodirect`, falling back
/// to `./downloads` when the platform has no Downloads folder.
pub fn default_download_dir() -> PathBuf {
    match dirs::download_dir() {
        Some(downloads) => downloads.join(APP_DIR_NAME),
        None => PathBuf::from("downloads"),
    }
}
