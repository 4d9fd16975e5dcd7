// ─── Resolution-and-fulfillment pipeline ───
// One mod per call, strictly sequential across a batch:
//   Unresolved → Resolved → FileSelected → {CachedHit | Fetched}
//     → {Installed | InstallSkipped | InstallError}
// Hard failures can only happen up to Resolved; everything later
// degrades to a reported failure that leaves the cache untouched.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::api::ModioClient;
use crate::core::cache::{DownloadRecord, ModCache};
use crate::core::downloader::Downloader;
use crate::core::error::{ModError, ModResult};
use crate::core::files;

/// Sidecar describing the most recent successful download.
pub const MOD_INFO_FILE_NAME: &str = "modinfo.json";

/// A parsed share URL: `https://mod.io/g/<game_slug>/m/<mod_slug>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModRequest {
    pub game_slug: String,
    pub mod_slug: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub install: bool,
    pub force: bool,
}

/// Identity established for one request; ids are immutable once set.
#[derive(Debug, Clone)]
pub struct ResolvedMod {
    pub game_id: u64,
    pub game_name: String,
    pub mod_id: u64,
    pub mod_name: String,
}

#[derive(Debug)]
pub enum ModOutcome {
    /// Latest version already fetched and (when requested) installed at
    /// a directory that still exists — nothing to do.
    UpToDate { resolved: ResolvedMod },
    /// The archive is on disk, freshly fetched or reused.
    Downloaded {
        resolved: ResolvedMod,
        path: PathBuf,
        reused_existing: bool,
    },
}

pub struct Pipeline {
    api: ModioClient,
    downloader: Downloader,
    cache: ModCache,
    download_dir: PathBuf,
}

impl Pipeline {
    pub fn new(api: ModioClient, downloader: Downloader, cache: ModCache, download_dir: PathBuf) -> Self {
        Self {
            api,
            downloader,
            cache,
            download_dir,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Resolve, select, reconcile against the cache, and fetch one mod.
    pub async fn process(&mut self, request: &ModRequest, opts: PipelineOptions) -> ModResult<ModOutcome> {
        // ── Resolve ─────────────────────────────────────
        let game_id = crate::core::resolve::resolve_game_id(&self.api, &request.game_slug).await?;
        let game = self.api.game(game_id).await?;
        let game_name = game.name.unwrap_or_default();
        if !game_name.is_empty() {
            println!("[Info] Game : {}", game_name);
        }

        let mod_id = crate::core::resolve::resolve_mod_id(&self.api, game_id, &request.mod_slug).await?;
        let detail = self.api.mod_detail(game_id, mod_id).await?;
        let mod_name = detail.name.unwrap_or_default();
        if !mod_name.is_empty() {
            println!("[Info] Mod  : {}", mod_name);
        }

        let resolved = ResolvedMod {
            game_id,
            game_name,
            mod_id,
            mod_name,
        };

        // ── Select ──────────────────────────────────────
        let published = self.api.mod_files(game_id, mod_id).await?;
        let latest = files::select_latest(&published)
            .ok_or_else(|| ModError::Other("Could not determine latest mod file.".into()))?;
        let Some((binary_url, filename)) = files::extract_download_info(latest) else {
            return Err(ModError::Other(
                "No valid download URL found in mod file.".into(),
            ));
        };
        let expected = files::expected_size(latest);
        let latest_version_id = latest.id;
        let latest_version_number = latest.version.clone();
        println!("[Info] Latest file: {}", filename);

        let dest = self.download_dir.join(&filename);

        // ── Reconcile ───────────────────────────────────
        if self.cache.should_skip_download(mod_id, latest_version_id, opts.force) {
            if opts.install && self.cache.should_skip_install(mod_id, latest_version_id, opts.force) {
                println!("[Info] Up to date — nothing to do.");
                return Ok(ModOutcome::UpToDate { resolved });
            }
            if file_matches_size(&dest, expected) {
                println!("[Info] Already latest version. Skipping download.");
                return Ok(ModOutcome::Downloaded {
                    resolved,
                    path: dest,
                    reused_existing: true,
                });
            }
            debug!("Cache hit for mod {} but file is missing; refetching", mod_id);
        }

        // ── Fetch ───────────────────────────────────────
        println!("[Status] Downloading...");
        let outcome = self
            .downloader
            .fetch(&binary_url, &dest, expected, !opts.force)
            .await?;
        if !outcome.reused_existing {
            println!("[Status] Download complete.");
        }

        self.cache
            .record_download(DownloadRecord {
                mod_id,
                mod_name: resolved.mod_name.clone(),
                latest_version_id,
                latest_version_number,
                file_name: filename,
                file_size: expected,
            })
            .await?;

        // Sidecar is informational; a write failure never fails the mod.
        if let Err(err) = write_mod_info(&self.download_dir, &resolved, latest_version_id).await {
            warn!("Could not write {}: {}", MOD_INFO_FILE_NAME, err);
        }

        Ok(ModOutcome::Downloaded {
            resolved,
            path: outcome.path,
            reused_existing: outcome.reused_existing,
        })
    }

    /// Record a completed install against the entry's latest version.
    pub async fn record_install(&mut self, mod_id: u64, installed_path: &Path) -> ModResult<()> {
        self.cache.record_install(mod_id, installed_path).await
    }
}

#[derive(Debug, Serialize)]
struct ModInfo<'a> {
    game_name: &'a str,
    mod_name: &'a str,
    mod_id: u64,
    file_id: u64,
    date_downloaded: String,
}

/// Drop a `modinfo.json` next to the archive describing what was just
/// downloaded. Overwritten on every successful fetch.
async fn write_mod_info(download_dir: &Path, resolved: &ResolvedMod, file_id: u64) -> ModResult<()> {
    let info = ModInfo {
        game_name: &resolved.game_name,
        mod_name: &resolved.mod_name,
        mod_id: resolved.mod_id,
        file_id,
        date_downloaded: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    };
    let path = download_dir.join(MOD_INFO_FILE_NAME);
    let json = serde_json::to_string_pretty(&info)?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|source| ModError::Io { path, source })
}

fn file_matches_size(path: &Path, expected: Option<u64>) -> bool {
    if !path.is_file() {
        return false;
    }
    match expected {
        None => true,
        Some(expected) => std::fs::metadata(path).is_ok_and(|m| m.len() == expected),
    }
}

// ── Share-URL parsing ───────────────────────────────────

fn url_regex() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^https?://(?:www\.)?mod\.io/g/([^/]+)/m/([^/?#]+)").unwrap()
    })
}

/// Parse a shared mod.io URL into its slug pair. Trailing arguments and
/// query/fragment noise are tolerated; anything else is rejected.
pub fn parse_mod_url(raw: &str) -> Option<ModRequest> {
    let first_token = raw.trim().split_whitespace().next()?;
    let captures = url_regex().captures(first_token)?;
    let game_slug = captures.get(1)?.as_str().trim().to_string();
    let mod_slug = captures.get(2)?.as_str().trim().to_string();
    if game_slug.is_empty() || mod_slug.is_empty() {
        return None;
    }
    Some(ModRequest {
        game_slug,
        mod_slug,
    })
}

/// Read a batch list: one URL per line, blanks and `#` comments skipped.
pub fn load_batch_urls(path: &Path) -> ModResult<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|source| ModError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_share_urls() {
        let req = parse_mod_url("https://mod.io/g/spaceengineers/m/assault-weapons-pack1").unwrap();
        assert_eq!(req.game_slug, "spaceengineers");
        assert_eq!(req.mod_slug, "assault-weapons-pack1");
    }

    #[test]
    fn tolerates_www_http_case_and_query_noise() {
        let req = parse_mod_url("HTTP://WWW.MOD.IO/g/drg/m/more-bugs?tab=files#x").unwrap();
        assert_eq!(req.game_slug, "drg");
        assert_eq!(req.mod_slug, "more-bugs");
    }

    #[test]
    fn rejects_non_share_urls() {
        assert!(parse_mod_url("https://mod.io/g/spaceengineers").is_none());
        assert!(parse_mod_url("https://example.com/g/a/m/b").is_none());
        assert!(parse_mod_url("not a url").is_none());
        assert!(parse_mod_url("").is_none());
    }

    #[test]
    fn only_the_first_whitespace_token_is_parsed() {
        let req = parse_mod_url("https://mod.io/g/a/m/b --install").unwrap();
        assert_eq!(req.mod_slug, "b");
    }

    #[test]
    fn batch_lists_skip_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mods.txt");
        std::fs::write(
            &path,
            "# my mods\nhttps://mod.io/g/a/m/one\n\n  https://mod.io/g/a/m/two  \n# done\n",
        )
        .unwrap();

        let urls = load_batch_urls(&path).unwrap();
        assert_eq!(urls, vec![
            "https://mod.io/g/a/m/one".to_string(),
            "https://mod.io/g/a/m/two".to_string(),
        ]);
    }

    #[tokio::test]
    async fn sidecar_records_the_download_identity() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = ResolvedMod {
            game_id: 51,
            game_name: "Space Engineers".to_string(),
            mod_id: 900,
            mod_name: "Rogue Knight".to_string(),
        };

        write_mod_info(dir.path(), &resolved, 125936).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(MOD_INFO_FILE_NAME)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["game_name"], "Space Engineers");
        assert_eq!(value["mod_name"], "Rogue Knight");
        assert_eq!(value["mod_id"], 900);
        assert_eq!(value["file_id"], 125936);
        assert!(value["date_downloaded"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn size_gate_accepts_unknown_expected_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pack.zip");
        std::fs::write(&path, b"12345").unwrap();

        assert!(file_matches_size(&path, None));
        assert!(file_matches_size(&path, Some(5)));
        assert!(!file_matches_size(&path, Some(6)));
        assert!(!file_matches_size(&dir.path().join("missing.zip"), None));
    }
}
