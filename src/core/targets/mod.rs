// ─── Install target detection ───
// Candidate directories for installs. The pipeline only consumes this
// list; selection happens in the CLI layer (or via --target).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

/// One candidate install directory.
#[derive(Debug, Clone)]
pub struct InstallTarget {
    pub label: String,
    pub path: PathBuf,
}

/// Verified-paths database (`games.json`) shipped alongside the tool.
#[derive(Debug, Deserialize)]
struct GamesDb {
    #[serde(default)]
    game_mod_paths: Vec<GameModPaths>,
}

#[derive(Debug, Deserialize)]
struct GameModPaths {
    name: String,
    #[serde(default)]
    mod_folder_paths: std::collections::BTreeMap<String, String>,
}

/// Detect install candidates for a resolved game.
///
/// Sources, in order: verified paths from `games.json`, then (Windows
/// only) the local mod.io storage tree for this game id. Duplicate paths
/// are removed case-insensitively, preserving first occurrence.
pub fn detect_install_targets(
    game_name: &str,
    game_id: u64,
    db_search_paths: &[PathBuf],
) -> Vec<InstallTarget> {
    let mut candidates = verified_targets(game_name, db_search_paths);
    candidates.extend(modio_storage_targets(game_id));
    dedup_by_path(candidates)
}

fn verified_targets(game_name: &str, db_search_paths: &[PathBuf]) -> Vec<InstallTarget> {
    let Some(db) = load_games_db(db_search_paths) else {
        return Vec::new();
    };
    let key = normalize_name(game_name);
    let mut out = Vec::new();
    for game in &db.game_mod_paths {
        if normalize_name(&game.name) != key {
            continue;
        }
        for raw in game.mod_folder_paths.values() {
            let expanded = expand_path(raw);
            if expanded.as_os_str().is_empty() || !expanded.is_dir() {
                continue;
            }
            out.push(InstallTarget {
                label: format!("{} - Verified", game.name),
                path: expanded,
            });
        }
    }
    out
}

fn load_games_db(search_paths: &[PathBuf]) -> Option<GamesDb> {
    for path in search_paths {
        let Ok(raw) = std::fs::read_to_string(path) else {
            continue;
        };
        match serde_json::from_str::<GamesDb>(&raw) {
            Ok(db) => {
                debug!("Loaded games db from {:?}", path);
                return Some(db);
            }
            Err(err) => {
                debug!("Skipping unreadable games db {:?}: {}", path, err);
            }
        }
    }
    None
}

/// Default search locations for `games.json`: beside the executable,
/// the download directory, and the user's Downloads folder.
pub fn default_db_search_paths(download_dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            paths.push(dir.join("games.json"));
        }
    }
    paths.push(download_dir.join("games.json"));
    if let Some(downloads) = dirs::download_dir() {
        paths.push(downloads.join("games.json"));
    }
    paths
}

#[cfg(windows)]
fn modio_storage_targets(game_id: u64) -> Vec<InstallTarget> {
    let mut out = Vec::new();
    let gid = game_id.to_string();
    for root in modio_storage_roots() {
        // Storage layout is <root>/<portal>/<game_id>/...; two levels deep.
        for depth1 in read_subdirs(&root) {
            if dir_name_is(&depth1, &gid) {
                out.push(storage_target(&gid, depth1));
                continue;
            }
            for depth2 in read_subdirs(&depth1) {
                if dir_name_is(&depth2, &gid) {
                    out.push(storage_target(&gid, depth2));
                }
            }
        }
    }
    out
}

#[cfg(windows)]
fn storage_target(gid: &str, path: PathBuf) -> InstallTarget {
    InstallTarget {
        label: format!("mod.io storage (game_id {})", gid),
        path,
    }
}

#[cfg(windows)]
fn dir_name_is(path: &Path, name: &str) -> bool {
    path.file_name().is_some_and(|n| n == name)
}

#[cfg(windows)]
fn read_subdirs(path: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(path)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(windows)]
fn modio_storage_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let public = std::env::var("PUBLIC").unwrap_or_else(|_| r"C:\Users\Public".to_string());
    let public_root = PathBuf::from(public).join("mod.io");
    if public_root.is_dir() {
        roots.push(public_root);
    }
    if let Ok(local) = std::env::var("LOCALAPPDATA") {
        let settings = PathBuf::from(local).join("mod.io").join("globalsettings.json");
        if let Ok(raw) = std::fs::read_to_string(&settings) {
            #[derive(Deserialize)]
            struct GlobalSettings {
                #[serde(rename = "RootLocalStoragePath")]
                root_local_storage_path: Option<PathBuf>,
            }
            if let Ok(parsed) = serde_json::from_str::<GlobalSettings>(&raw) {
                if let Some(root) = parsed.root_local_storage_path {
                    if root.is_dir() {
                        roots.push(root);
                    }
                }
            }
        }
    }
    dedup_paths(roots)
}

#[cfg(not(windows))]
fn modio_storage_targets(_game_id: u64) -> Vec<InstallTarget> {
    Vec::new()
}

#[cfg(windows)]
fn dedup_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.to_string_lossy().to_lowercase()))
        .collect()
}

fn dedup_by_path(targets: Vec<InstallTarget>) -> Vec<InstallTarget> {
    let mut seen = std::collections::HashSet::new();
    targets
        .into_iter()
        .filter(|t| seen.insert(t.path.to_string_lossy().to_lowercase()))
        .collect()
}

/// Lowercase alphanumeric form used to match game names against the db.
pub fn normalize_name(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Expand `{USERNAME}`, `~`, and `$VAR`/`%VAR%` references in a db path.
fn expand_path(raw: &str) -> PathBuf {
    let mut value = raw.replace("[Manual]", "").trim().to_string();
    if let Ok(user) = std::env::var("USERNAME").or_else(|_| std::env::var("USER")) {
        value = value.replace("{USERNAME}", &user);
    }
    if let Some(rest) = value.strip_prefix("~/").or_else(|| value.strip_prefix("~\\")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    value = expand_env_vars(&value);
    PathBuf::from(value)
}

/// Expand `%VAR%` references left to right. Replacement values are
/// emitted verbatim and never re-scanned, so a value containing `%` is
/// safe; undefined variables expand to nothing.
fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('%') {
        let Some(end_rel) = rest[start + 1..].find('%') else {
            break;
        };
        let end = start + 1 + end_rel;
        out.push_str(&rest[..start]);
        let name = &rest[start + 1..end];
        if let Ok(replacement) = std::env::var(name) {
            out.push_str(&replacement);
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_name("Space Engineers"), "spaceengineers");
        assert_eq!(normalize_name("S.T.A.L.K.E.R. 2"), "stalker2");
    }

    #[test]
    fn verified_paths_match_by_normalized_name() {
        let dir = tempfile::tempdir().unwrap();
        let mods_dir = dir.path().join("Mods");
        std::fs::create_dir_all(&mods_dir).unwrap();

        let db_path = dir.path().join("games.json");
        let db = serde_json::json!({
            "game_mod_paths": [{
                "name": "Space Engineers",
                "mod_folder_paths": { "steam": mods_dir.to_string_lossy() }
            }]
        });
        std::fs::write(&db_path, db.to_string()).unwrap();

        // Slug punctuation differs from the db name; normalization bridges it.
        let targets = detect_install_targets("space-engineers", 51, &[db_path.clone()]);
        assert_eq!(targets.len(), 1);

        let targets = detect_install_targets("Space Engineers", 51, &[db_path]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path, mods_dir);
        assert!(targets[0].label.contains("Verified"));
    }

    #[test]
    fn nonexistent_verified_paths_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("games.json");
        let db = serde_json::json!({
            "game_mod_paths": [{
                "name": "Ghost Game",
                "mod_folder_paths": { "steam": "/definitely/not/here" }
            }]
        });
        std::fs::write(&db_path, db.to_string()).unwrap();

        assert!(detect_install_targets("Ghost Game", 1, &[db_path]).is_empty());
    }

    #[test]
    fn missing_db_yields_no_candidates() {
        assert!(detect_install_targets("Anything", 1, &[PathBuf::from("/nope.json")]).is_empty());
    }

    #[test]
    fn env_expansion_replaces_known_and_drops_unknown() {
        std::env::set_var("MODIODIRECT_TEST_ROOT", "/srv/games");
        assert_eq!(
            expand_env_vars("%MODIODIRECT_TEST_ROOT%/Mods"),
            "/srv/games/Mods"
        );
        assert_eq!(expand_env_vars("%MODIODIRECT_TEST_MISSING%/Mods"), "/Mods");
        assert_eq!(expand_env_vars("plain/path"), "plain/path");
        // A trailing unpaired marker passes through untouched.
        assert_eq!(expand_env_vars("50% done"), "50% done");
    }

    #[test]
    fn env_expansion_terminates_when_a_value_contains_the_marker() {
        std::env::set_var("MODIODIRECT_TEST_PCT", "100%MODIODIRECT_TEST_PCT%");
        assert_eq!(
            expand_env_vars("%MODIODIRECT_TEST_PCT%/Mods"),
            "100%MODIODIRECT_TEST_PCT%/Mods"
        );
    }
}
