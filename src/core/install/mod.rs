// ─── Install Reconciler ───
// Extracts a downloaded archive and merges its contents into a selected
// game directory. Extraction happens inside a scoped temporary directory
// that is removed on every exit path.

use std::path::Path;

use tracing::{debug, info};

use crate::core::error::{ModError, ModResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// The archive's folder already exists, non-empty, under the target
    /// and no force override was given — nothing to do.
    AlreadyInstalled,
}

impl InstallOutcome {
    /// User-facing status line for this outcome.
    pub fn status_line(&self) -> &'static str {
        match self {
            InstallOutcome::Installed => "[Status] Install complete.",
            InstallOutcome::AlreadyInstalled => "[Info] Up to date — nothing to do.",
        }
    }
}

/// Install `archive` into `target_dir`.
///
/// Known limitation: a failure mid-copy is reported but already-copied
/// entries are not rolled back.
pub async fn install(archive: &Path, target_dir: &Path, force: bool) -> ModResult<InstallOutcome> {
    if !archive.is_file() {
        return Err(ModError::InvalidPath(archive.to_path_buf()));
    }
    if !target_dir.is_dir() {
        return Err(ModError::InvalidPath(target_dir.to_path_buf()));
    }

    // Idempotence guard: a prior install of this archive leaves a
    // non-empty directory named after the archive's stem.
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if !force && !stem.is_empty() {
        let existing = target_dir.join(&stem);
        if dir_is_nonempty(&existing) {
            info!("Up to date — nothing to do.");
            return Ok(InstallOutcome::AlreadyInstalled);
        }
    }

    let archive = archive.to_path_buf();
    let target = target_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_and_merge(&archive, &target))
        .await
        .map_err(|e| ModError::Other(format!("Task join error: {}", e)))??;

    info!("Mod installed successfully: {:?}", target_dir);
    Ok(InstallOutcome::Installed)
}

fn extract_and_merge(archive: &Path, target_dir: &Path) -> ModResult<()> {
    // TempDir removes the extraction tree on drop, success or failure.
    let staging = tempfile::Builder::new()
        .prefix("modiodirect_extract_")
        .tempdir()
        .map_err(|source| ModError::Io {
            path: std::env::temp_dir(),
            source,
        })?;

    let file = std::fs::File::open(archive).map_err(|source| ModError::Io {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file)?;
    zip.extract(staging.path())?;
    debug!("Extracted {:?} to {:?}", archive, staging.path());

    for entry in std::fs::read_dir(staging.path()).map_err(|source| ModError::Io {
        path: staging.path().to_path_buf(),
        source,
    })? {
        let entry = entry.map_err(|source| ModError::Io {
            path: staging.path().to_path_buf(),
            source,
        })?;
        let src = entry.path();
        let dst = target_dir.join(entry.file_name());
        if src.is_dir() {
            copy_dir_recursive(&src, &dst)?;
        } else {
            std::fs::copy(&src, &dst).map_err(|source| ModError::Io {
                path: dst.clone(),
                source,
            })?;
        }
    }

    Ok(())
}

/// Recursive merge: directories are created as needed, files overwrite.
fn copy_dir_recursive(source: &Path, destination: &Path) -> ModResult<()> {
    std::fs::create_dir_all(destination).map_err(|source_err| ModError::Io {
        path: destination.to_path_buf(),
        source: source_err,
    })?;
    for entry in std::fs::read_dir(source).map_err(|source_err| ModError::Io {
        path: source.to_path_buf(),
        source: source_err,
    })? {
        let entry = entry.map_err(|source_err| ModError::Io {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let src = entry.path();
        let dst = destination.join(entry.file_name());
        if src.is_dir() {
            copy_dir_recursive(&src, &dst)?;
        } else {
            std::fs::copy(&src, &dst).map_err(|source_err| ModError::Io {
                path: dst.clone(),
                source: source_err,
            })?;
        }
    }
    Ok(())
}

fn dir_is_nonempty(path: &Path) -> bool {
    path.is_dir()
        && std::fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Build a small archive: pack/readme.txt and pack/data/config.ini.
    fn write_test_zip(path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        writer.add_directory("pack/", options).unwrap();
        writer.start_file("pack/readme.txt", options).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.add_directory("pack/data/", options).unwrap();
        writer.start_file("pack/data/config.ini", options).unwrap();
        writer.write_all(b"[core]").unwrap();
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn installs_and_merges_top_level_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pack.zip");
        write_test_zip(&archive);
        let target = dir.path().join("Mods");
        std::fs::create_dir_all(&target).unwrap();

        let outcome = install(&archive, &target, false).await.unwrap();
        assert_eq!(outcome, InstallOutcome::Installed);
        assert!(target.join("pack/readme.txt").is_file());
        assert!(target.join("pack/data/config.ini").is_file());
    }

    #[tokio::test]
    async fn second_install_is_a_noop_success() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pack.zip");
        write_test_zip(&archive);
        let target = dir.path().join("Mods");
        std::fs::create_dir_all(&target).unwrap();

        assert_eq!(
            install(&archive, &target, false).await.unwrap(),
            InstallOutcome::Installed
        );
        assert_eq!(
            install(&archive, &target, false).await.unwrap(),
            InstallOutcome::AlreadyInstalled
        );
    }

    #[tokio::test]
    async fn force_reinstalls_over_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pack.zip");
        write_test_zip(&archive);
        let target = dir.path().join("Mods");
        std::fs::create_dir_all(&target).unwrap();

        install(&archive, &target, false).await.unwrap();
        std::fs::write(target.join("pack/readme.txt"), b"stale").unwrap();

        assert_eq!(
            install(&archive, &target, true).await.unwrap(),
            InstallOutcome::Installed
        );
        assert_eq!(
            std::fs::read(target.join("pack/readme.txt")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn status_lines_distinguish_fresh_install_from_noop() {
        assert_eq!(
            InstallOutcome::Installed.status_line(),
            "[Status] Install complete."
        );
        assert_eq!(
            InstallOutcome::AlreadyInstalled.status_line(),
            "[Info] Up to date — nothing to do."
        );
    }

    #[tokio::test]
    async fn non_zip_input_is_a_recoverable_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("not-a-zip.zip");
        std::fs::write(&archive, b"plain text").unwrap();
        let target = dir.path().join("Mods");
        std::fs::create_dir_all(&target).unwrap();

        let err = install(&archive, &target, false).await.unwrap_err();
        assert!(matches!(err, ModError::Zip(_)));
    }

    #[tokio::test]
    async fn invalid_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("missing.zip");
        let target = dir.path().join("Mods");

        assert!(matches!(
            install(&archive, &target, false).await.unwrap_err(),
            ModError::InvalidPath(_)
        ));

        write_test_zip(&archive);
        assert!(matches!(
            install(&archive, &target, false).await.unwrap_err(),
            ModError::InvalidPath(_)
        ));
    }
}
