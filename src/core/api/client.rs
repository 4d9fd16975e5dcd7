use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::model::{DataPage, Game, Mod, ModFile};
use crate::core::error::{ModError, ModResult};
use crate::core::http::METADATA_TIMEOUT;

pub const API_BASE: &str = "https://api.mod.io/v1";

/// Thin client over the mod.io v1 REST API.
///
/// Every request carries the API key as a query parameter. Status codes
/// are classified into the crate's error taxonomy here, once, so the
/// resolver and pipeline only ever see typed errors.
pub struct ModioClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ModioClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Point the client at a local stand-in server.
    #[cfg(test)]
    pub(crate) fn with_base_url(
        client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Cheapest authenticated call; used to validate credentials before
    /// any pipeline work starts. A 401 here is fatal for the session.
    pub async fn validate_key(&self) -> ModResult<()> {
        let url = format!("{}/games", self.base_url);
        let _: DataPage<Game> = self
            .get_json(&url, &[("limit", "1".to_string())], "while validating API key")
            .await?;
        Ok(())
    }

    // ── Games ───────────────────────────────────────────

    /// Exact filter: `name_id == slug`, limit 1.
    pub async fn games_by_name_id(&self, slug: &str) -> ModResult<Vec<Game>> {
        let url = format!("{}/games", self.base_url);
        let page: DataPage<Game> = self
            .get_json(
                &url,
                &[("name_id", slug.to_string()), ("limit", "1".to_string())],
                "while resolving game",
            )
            .await?;
        Ok(page.data)
    }

    /// Full-text search: `_q = slug`, limit 100.
    pub async fn search_games(&self, slug: &str) -> ModResult<Vec<Game>> {
        let url = format!("{}/games", self.base_url);
        let page: DataPage<Game> = self
            .get_json(
                &url,
                &[("_q", slug.to_string()), ("limit", "100".to_string())],
                "while searching game",
            )
            .await?;
        Ok(page.data)
    }

    pub async fn game(&self, game_id: u64) -> ModResult<Game> {
        let url = format!("{}/games/{}", self.base_url, game_id);
        self.get_json(&url, &[], "while fetching game details").await
    }

    // ── Mods ────────────────────────────────────────────

    pub async fn mods_by_name_id(&self, game_id: u64, slug: &str) -> ModResult<Vec<Mod>> {
        let url = format!("{}/games/{}/mods", self.base_url, game_id);
        let page: DataPage<Mod> = self
            .get_json(
                &url,
                &[("name_id", slug.to_string()), ("limit", "1".to_string())],
                "while resolving mod",
            )
            .await?;
        Ok(page.data)
    }

    pub async fn search_mods(&self, game_id: u64, slug: &str) -> ModResult<Vec<Mod>> {
        let url = format!("{}/games/{}/mods", self.base_url, game_id);
        let page: DataPage<Mod> = self
            .get_json(
                &url,
                &[("_q", slug.to_string()), ("limit", "100".to_string())],
                "while searching mod",
            )
            .await?;
        Ok(page.data)
    }

    /// Cross-game filter constrained server-side to `game_id`.
    pub async fn global_mods_by_name_id(&self, game_id: u64, slug: &str) -> ModResult<Vec<Mod>> {
        let url = format!("{}/mods", self.base_url);
        let page: DataPage<Mod> = self
            .get_json(
                &url,
                &[
                    ("game_id", game_id.to_string()),
                    ("name_id", slug.to_string()),
                    ("limit", "1".to_string()),
                ],
                "while resolving mod (global)",
            )
            .await?;
        Ok(page.data)
    }

    /// Cross-game full-text search; the resolver filters by `game_id`
    /// client-side.
    pub async fn global_search_mods(&self, slug: &str) -> ModResult<Vec<Mod>> {
        let url = format!("{}/mods", self.base_url);
        let page: DataPage<Mod> = self
            .get_json(
                &url,
                &[("_q", slug.to_string()), ("limit", "100".to_string())],
                "while searching mod (global)",
            )
            .await?;
        Ok(page.data)
    }

    pub async fn mod_detail(&self, game_id: u64, mod_id: u64) -> ModResult<Mod> {
        let url = format!("{}/games/{}/mods/{}", self.base_url, game_id, mod_id);
        self.get_json(&url, &[], "while fetching mod details").await
    }

    pub async fn mod_files(&self, game_id: u64, mod_id: u64) -> ModResult<Vec<ModFile>> {
        let url = format!("{}/games/{}/mods/{}/files", self.base_url, game_id, mod_id);
        let page: DataPage<ModFile> = self
            .get_json(
                &url,
                &[("limit", "100".to_string())],
                "while fetching mod files",
            )
            .await?;
        Ok(page.data)
    }

    // ── Transport + classification ──────────────────────

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> ModResult<T> {
        debug!("GET {} {}", url, context);

        let mut request = self
            .client
            .get(url)
            .timeout(METADATA_TIMEOUT)
            .query(&[("api_key", self.api_key.as_str())]);
        for (key, value) in query {
            request = request.query(&[(*key, value.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        match status.as_u16() {
            401 => Err(ModError::Unauthorized),
            429 => Err(ModError::RateLimited {
                context: context.to_string(),
            }),
            404 => Err(ModError::NotFound {
                context: context.to_string(),
            }),
            code if code >= 400 => Err(ModError::Api {
                status: code,
                context: context.to_string(),
            }),
            _ => response.json::<T>().await.map_err(|_| ModError::DataShape {
                context: context.to_string(),
            }),
        }
    }
}
