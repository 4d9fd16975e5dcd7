use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the whole pipeline.
/// Every module returns `Result<T, ModError>`.
#[derive(Debug, Error)]
pub enum ModError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid path: {0:?}")]
    InvalidPath(PathBuf),

    // ── Network ─────────────────────────────────────────
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Backend classification ──────────────────────────
    #[error("invalid API key (401 Unauthorized)")]
    Unauthorized,

    #[error("rate limited (429) {context}")]
    RateLimited { context: String },

    #[error("not found {context}")]
    NotFound { context: String },

    #[error("API error ({status}) {context}")]
    Api { status: u16, context: String },

    #[error("empty or invalid API response {context}")]
    DataShape { context: String },

    // ── Integrity ───────────────────────────────────────
    #[error("size mismatch for {path:?}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    // ── Archive ─────────────────────────────────────────
    #[error("zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type ModResult<T> = Result<T, ModError>;

impl ModError {
    /// Errors that must abort the current resolution chain instead of
    /// advancing to the next fallback strategy.
    pub fn is_fatal_for_resolution(&self) -> bool {
        matches!(
            self,
            ModError::Unauthorized | ModError::RateLimited { .. } | ModError::DataShape { .. }
        )
    }

    /// One classified, human-readable line per failure. Mirrors the
    /// status-code taxonomy the backend exposes.
    pub fn friendly(&self) -> String {
        match self {
            ModError::Unauthorized => {
                "Mod is private, inaccessible, or requires authentication.".to_string()
            }
            ModError::RateLimited { .. } => "Rate limited. Try again later.".to_string(),
            ModError::NotFound { .. } => "Mod or game not found.".to_string(),
            ModError::Http(_) => "Network error occurred.".to_string(),
            ModError::SizeMismatch { .. } => "Downloaded file size mismatch.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ModError {
    fn from(source: std::io::Error) -> Self {
        ModError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_fatal_for_resolution() {
        let err = ModError::RateLimited {
            context: "while resolving game".into(),
        };
        assert!(err.is_fatal_for_resolution());
    }

    #[test]
    fn server_error_falls_through_resolution() {
        let err = ModError::Api {
            status: 500,
            context: "while resolving mod".into(),
        };
        assert!(!err.is_fatal_for_resolution());
    }

    #[test]
    fn friendly_lines_are_classified() {
        let err = ModError::NotFound {
            context: "while resolving game".into(),
        };
        assert_eq!(err.friendly(), "Mod or game not found.");
        assert!(ModError::Unauthorized.friendly().contains("private"));
    }
}
