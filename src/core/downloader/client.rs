use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::error::{ModError, ModResult};
use crate::core::http::DOWNLOAD_TIMEOUT;

/// Backoff between the two fetch attempts.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);
/// Rate limits back off longer than generic failures.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);
/// Total attempts per fetch call: the first try plus exactly one retry.
const MAX_ATTEMPTS: u32 = 2;

/// Result of a fetch: where the bytes live and whether an existing file
/// was reused instead of hitting the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub path: PathBuf,
    pub reused_existing: bool,
}

/// Size-verified, single-stream downloader.
///
/// Bytes are streamed to `<dest>.part` and renamed into place only after
/// the declared size (when known) has been verified, so a failed attempt
/// never leaves a file at the destination path.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch `url` into `dest`.
    ///
    /// With `allow_reuse`, an existing file at `dest` short-circuits the
    /// whole fetch — previously validated content is not re-verified.
    /// Otherwise: two total attempts covering transport failures, rate
    /// limits, any ≥400 response, and size mismatches.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected_size: Option<u64>,
        allow_reuse: bool,
    ) -> ModResult<FetchOutcome> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ModError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        if allow_reuse && dest.exists() {
            info!("File already exists, skipping: {:?}", dest);
            return Ok(FetchOutcome {
                path: dest.to_path_buf(),
                reused_existing: true,
            });
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(url, dest, expected_size).await {
                Ok(path) => {
                    return Ok(FetchOutcome {
                        path,
                        reused_existing: false,
                    })
                }
                Err(err) if attempt < MAX_ATTEMPTS => {
                    warn!("Download attempt {} failed: {}", attempt, err);
                    let backoff = match err {
                        ModError::RateLimited { .. } => RATE_LIMIT_BACKOFF,
                        _ => RETRY_BACKOFF,
                    };
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt(&self, url: &str, dest: &Path, expected_size: Option<u64>) -> ModResult<PathBuf> {
        // A stale file at the destination is removed before writing.
        if dest.exists() {
            let _ = tokio::fs::remove_file(dest).await;
        }

        let response = self
            .client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ModError::RateLimited {
                context: "while downloading".to_string(),
            });
        }
        if !status.is_success() {
            return Err(ModError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let part_path = part_path_for(dest);

        let write_result = self
            .stream_to_file(response, &part_path, total_bytes)
            .await;

        let written = match write_result {
            Ok(written) => written,
            Err(err) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(err);
            }
        };

        if total_bytes.is_none() {
            println!("[Info] Download complete (size unknown).");
        }

        if let Some(expected) = expected_size {
            if written != expected {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(ModError::SizeMismatch {
                    path: dest.to_path_buf(),
                    expected,
                    actual: written,
                });
            }
        }

        tokio::fs::rename(&part_path, dest)
            .await
            .map_err(|source| ModError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(dest.to_path_buf())
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        part_path: &Path,
        total_bytes: Option<u64>,
    ) -> ModResult<u64> {
        let mut file = tokio::fs::File::create(part_path)
            .await
            .map_err(|source| ModError::Io {
                path: part_path.to_path_buf(),
                source,
            })?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_reported: u8 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|source| ModError::Io {
                    path: part_path.to_path_buf(),
                    source,
                })?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total_bytes {
                if let Some(pct) = progress_milestone(downloaded, total, last_reported) {
                    println!("Downloading... {}%", pct);
                    last_reported = pct;
                }
            }
        }

        file.flush().await.map_err(|source| ModError::Io {
            path: part_path.to_path_buf(),
            source,
        })?;
        // Handle dropped here before the rename — matters on Windows.
        drop(file);

        Ok(downloaded)
    }
}

fn part_path_for(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());
    name.push_str(".part");
    dest.with_file_name(name)
}

/// Next 5%-granularity milestone to report, if one has been crossed.
fn progress_milestone(downloaded: u64, total: u64, last_reported: u8) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let pct = ((downloaded.saturating_mul(100)) / total).min(100) as u8;
    if pct >= last_reported.saturating_add(5) || (pct == 100 && last_reported != 100) {
        Some(pct)
    } else {
        None
    }
}
