use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use modiodirect::core::api::ModioClient;
use modiodirect::core::cache::{ModCache, CACHE_FILE_NAME};
use modiodirect::core::config::{default_config_path, default_download_dir, ApiConfig};
use modiodirect::core::downloader::Downloader;
use modiodirect::core::error::{ModError, ModResult};
use modiodirect::core::http::build_http_client;
use modiodirect::core::install;
use modiodirect::core::pipeline::{
    load_batch_urls, parse_mod_url, ModOutcome, Pipeline, PipelineOptions, ResolvedMod,
};
use modiodirect::core::targets::{default_db_search_paths, detect_install_targets};

/// Resolve mod.io share URLs into direct downloads.
#[derive(Debug, Parser)]
#[command(
    name = "modiodirect",
    version,
    about = "ModioDirect — resolve mod.io share URLs into direct downloads",
    after_help = "Examples:\n  \
        modiodirect https://mod.io/g/spaceengineers/m/assault-weapons-pack1\n  \
        modiodirect https://mod.io/g/spaceengineers/m/assault-weapons-pack1 --install\n  \
        modiodirect file:mods.txt --install --target /games/se/Mods"
)]
struct Cli {
    /// mod.io share URL, `file:PATH`, or a `.txt` batch list
    mod_url: Option<String>,

    /// Install the mod into a game folder after downloading
    #[arg(long)]
    install: bool,

    /// Redownload and reinstall regardless of the cached version
    #[arg(long)]
    force: bool,

    /// Install directory (skips folder detection)
    #[arg(long, value_name = "DIR")]
    target: Option<PathBuf>,

    /// mod.io API key (overrides MODIO_API_KEY and the config file)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Do not persist the API key to the config file
    #[arg(long)]
    no_config: bool,

    /// Verbose diagnostics
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    print_banner();

    if let Err(err) = run(cli).await {
        println!("[Error] {}", err.friendly());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> ModResult<()> {
    let Some(raw_url) = cli.mod_url.clone() else {
        return Err(ModError::Other(
            "No URL given. Pass a mod.io share URL, file:PATH, or a .txt batch list.".into(),
        ));
    };

    // ── Credentials ─────────────────────────────────────
    let config_path = default_config_path();
    let mut config = if cli.no_config {
        ApiConfig::default()
    } else {
        ApiConfig::load(&config_path).await
    };

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("MODIO_API_KEY").ok().filter(|k| !k.is_empty()))
        .unwrap_or_else(|| config.api_key.clone());
    if api_key.trim().is_empty() {
        return Err(ModError::Other(
            "API key required. Pass --api-key, set MODIO_API_KEY, or fill the config file.".into(),
        ));
    }

    let api = ModioClient::new(build_http_client()?, api_key.trim());
    if let Err(err) = api.validate_key().await {
        return Err(match err {
            ModError::Unauthorized => ModError::Other("Invalid API key (401 Unauthorized).".into()),
            other => other,
        });
    }
    println!("[Info] API key validated.");
    if !cli.no_config && config.api_key != api_key.trim() {
        config.api_key = api_key.trim().to_string();
        if let Err(err) = config.save(&config_path).await {
            println!("[Error] Failed to save config: {}", err);
        }
    }

    // ── Pipeline setup ──────────────────────────────────
    let download_dir = default_download_dir();
    let cache = ModCache::load(download_dir.join(CACHE_FILE_NAME)).await;
    let downloader = Downloader::new(api.http_client().clone());
    let mut pipeline = Pipeline::new(api, downloader, cache, download_dir);

    let opts = PipelineOptions {
        install: cli.install,
        force: cli.force,
    };

    // ── Collect requests ────────────────────────────────
    let urls: Vec<String> = if let Some(batch_path) = batch_path_from(&raw_url) {
        let urls = load_batch_urls(&batch_path)?;
        if urls.is_empty() {
            return Err(ModError::Other("Batch file is empty or unreadable.".into()));
        }
        println!("[Info] Batch mode: {} URL(s)", urls.len());
        urls
    } else {
        vec![raw_url]
    };

    // ── Sequential run ──────────────────────────────────
    let total = urls.len();
    let mut completed = 0usize;
    // Folder detection runs once per batch, on the first resolved game.
    let mut chosen_target: Option<PathBuf> = cli.target.clone();

    for url in &urls {
        let Some(request) = parse_mod_url(url) else {
            println!(
                "[Error] Invalid mod.io URL: {} (expected https://mod.io/g/<game_slug>/m/<mod_slug>)",
                url
            );
            continue;
        };
        if total > 1 {
            println!("[Info] Processing: {}", url);
        }

        let outcome = match pipeline.process(&request, opts).await {
            Ok(outcome) => outcome,
            // Bad credentials kill the whole session; anything else is
            // local to this batch item.
            Err(ModError::Unauthorized) => return Err(ModError::Unauthorized),
            Err(err) => {
                println!("[Error] {}", err.friendly());
                continue;
            }
        };

        match outcome {
            ModOutcome::UpToDate { .. } => {
                completed += 1;
            }
            ModOutcome::Downloaded {
                resolved,
                path,
                reused_existing,
            } => {
                completed += 1;
                if !cli.install {
                    if !reused_existing {
                        println!("[Info] Saved as: {}", path.display());
                    } else {
                        println!("[Info] Using existing file.");
                    }
                    continue;
                }

                let Some(target) =
                    resolve_install_target(&mut chosen_target, &resolved, pipeline.download_dir())
                else {
                    println!("[Error] Mod folder not found. Install skipped.");
                    continue;
                };

                match install::install(&path, &target, cli.force).await {
                    Ok(outcome) => {
                        println!("{}", outcome.status_line());
                        if let Err(err) = pipeline.record_install(resolved.mod_id, &target).await {
                            println!("[Error] {}", err.friendly());
                        }
                    }
                    Err(ModError::Zip(_)) => {
                        println!("[Error] Downloaded file is not a ZIP. Extraction skipped.");
                    }
                    Err(err) => {
                        println!("[Error] Install failed: {}", err.friendly());
                    }
                }
            }
        }
    }

    if total > 1 {
        println!("[Info] Batch complete: {}/{} successful.", completed, total);
    }
    if completed == 0 {
        return Err(ModError::Other("No mods were processed successfully.".into()));
    }
    Ok(())
}

/// Pick the install directory: an explicit `--target` wins, otherwise
/// folder detection — unambiguous single candidate only, since there is
/// no interactive chooser. The choice is sticky for the whole batch.
fn resolve_install_target(
    chosen: &mut Option<PathBuf>,
    resolved: &ResolvedMod,
    download_dir: &Path,
) -> Option<PathBuf> {
    if let Some(target) = chosen.as_ref() {
        if target.is_dir() {
            return Some(target.clone());
        }
        println!("[Error] Target install path is invalid: {}", target.display());
        return None;
    }

    let db_paths = default_db_search_paths(download_dir);
    let candidates = detect_install_targets(&resolved.game_name, resolved.game_id, &db_paths);
    match candidates.len() {
        0 => None,
        1 => {
            println!(
                "[Info] Install location: {} -> {}",
                candidates[0].label,
                candidates[0].path.display()
            );
            *chosen = Some(candidates[0].path.clone());
            chosen.clone()
        }
        _ => {
            println!("Multiple install locations found; re-run with --target:");
            for (idx, candidate) in candidates.iter().enumerate() {
                println!(
                    "[{}] {} -> {}",
                    idx + 1,
                    candidate.label,
                    candidate.path.display()
                );
            }
            None
        }
    }
}

fn batch_path_from(raw: &str) -> Option<PathBuf> {
    if let Some(rest) = raw.strip_prefix("file:") {
        let trimmed = rest.trim().trim_matches('"').trim_matches('\'');
        if trimmed.is_empty() {
            return None;
        }
        return Some(PathBuf::from(trimmed));
    }
    if raw.to_ascii_lowercase().ends_with(".txt") {
        let path = PathBuf::from(raw.trim());
        if path.is_file() {
            return Some(path);
        }
    }
    None
}

fn print_banner() {
    println!("ModioDirect Downloader Tool v{}", env!("CARGO_PKG_VERSION"));
    println!("-------------------------------------------------------");
}
