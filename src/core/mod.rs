// ─── ModioDirect Core ───
// Resolve-and-fulfill pipeline for mod.io share URLs.
//
// Architecture:
//   core/
//     api/        — REST client + response models, status classification
//     resolve/    — slug → numeric id via an ordered fallback chain
//     files/      — latest-version selection + download info extraction
//     downloader/ — streamed, size-verified fetch with bounded retries
//     cache/      — write-through reconciliation cache (mod_cache.json)
//     install/    — archive extraction + merge into a game directory
//     targets/    — install-target candidates (games.json, mod.io storage)
//     config/     — persisted API-key config
//     pipeline/   — per-mod orchestration state machine

pub mod api;
pub mod cache;
pub mod config;
pub mod downloader;
pub mod error;
pub mod files;
pub mod http;
pub mod install;
pub mod pipeline;
pub mod resolve;
pub mod targets;
