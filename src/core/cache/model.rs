use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cached record per mod ever processed; created on first successful
/// fetch, updated on every later fetch or install, never auto-deleted.
///
/// Invariant: `installed_version_id` is only ever recorded equal to
/// `latest_version_id` — an install is never marked current against a
/// version other than the one just fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub mod_id: u64,
    pub mod_name: String,
    pub latest_version_id: u64,
    pub latest_version_number: Option<String>,
    pub file_name: String,
    pub file_size: Option<u64>,
    pub download_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_path: Option<PathBuf>,
}

/// Persisted cache document: `{"mods": {"<mod id>": entry}}`.
///
/// A BTreeMap keeps the on-disk document stable across rewrites.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CacheDocument {
    #[serde(default)]
    pub mods: BTreeMap<String, CacheEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_through_json() {
        let entry = CacheEntry {
            mod_id: 123,
            mod_name: "Assault Weapons Pack".into(),
            latest_version_id: 456,
            latest_version_number: Some("1.0.2".into()),
            file_name: "awp.zip".into(),
            file_size: Some(15181),
            download_date: "2026-08-23T10:00:00Z".parse().unwrap(),
            installed_version_id: Some(456),
            installed_path: Some(PathBuf::from("/games/se/Mods")),
        };

        let json = serde_json::to_string_pretty(&entry).unwrap();
        let reloaded: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, reloaded);
    }

    #[test]
    fn document_tolerates_missing_mods_key() {
        let doc: CacheDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.mods.is_empty());
    }

    #[test]
    fn uninstalled_entry_omits_install_fields() {
        let entry = CacheEntry {
            mod_id: 1,
            mod_name: "m".into(),
            latest_version_id: 2,
            latest_version_number: None,
            file_name: "m.zip".into(),
            file_size: None,
            download_date: Utc::now(),
            installed_version_id: None,
            installed_path: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("installed_version_id"));
        assert!(!json.contains("installed_path"));
    }
}
