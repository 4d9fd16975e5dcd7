// ─── Identity Resolver ───
// Turns (game slug, mod slug) into stable numeric ids via an ordered
// chain of lookup strategies. Each strategy yields Found, a definitive
// Miss (advance), or an error: fatal errors abort the chain, everything
// else advances while the most specific message is preserved.

use tracing::debug;

use crate::core::api::{ModioClient, Slugged};
use crate::core::error::{ModError, ModResult};

/// Outcome of a single lookup strategy.
enum Lookup {
    Found(u64),
    /// Definitive "no match here"; the next strategy is evaluated.
    Miss,
}

/// Folds strategy results in order, short-circuiting on the first id.
struct Chain {
    preserved: Option<ModError>,
}

impl Chain {
    fn new() -> Self {
        Self { preserved: None }
    }

    fn step(&mut self, result: ModResult<Lookup>) -> ModResult<Option<u64>> {
        match result {
            Ok(Lookup::Found(id)) => Ok(Some(id)),
            Ok(Lookup::Miss) => Ok(None),
            Err(err) if err.is_fatal_for_resolution() => Err(err),
            Err(err) => {
                // A backend's own message beats a generic not-found.
                let keep_existing = matches!(
                    (&self.preserved, &err),
                    (Some(ModError::Api { .. }), ModError::NotFound { .. })
                        | (Some(ModError::Http(_)), ModError::NotFound { .. })
                );
                if !keep_existing {
                    self.preserved = Some(err);
                }
                Ok(None)
            }
        }
    }

    fn exhausted(self, context: &str) -> ModError {
        self.preserved.unwrap_or(ModError::NotFound {
            context: context.to_string(),
        })
    }
}

/// Resolve a game slug to its numeric id.
///
/// Strategy order: exact `name_id` filter, then full-text search with a
/// case-insensitive client-side slug match.
pub async fn resolve_game_id(api: &ModioClient, game_slug: &str) -> ModResult<u64> {
    let mut chain = Chain::new();

    if let Some(id) = chain.step(filter_games(api, game_slug).await)? {
        return Ok(id);
    }
    if let Some(id) = chain.step(search_games(api, game_slug).await)? {
        return Ok(id);
    }

    Err(chain.exhausted("while resolving game"))
}

/// Resolve a mod slug (or numeric id) within a game to its numeric id.
///
/// Strategy order: per-game filter, per-game search, global filter
/// constrained to the game, global search filtered client-side by
/// `game_id`, and finally a direct-by-id lookup for purely numeric slugs.
pub async fn resolve_mod_id(api: &ModioClient, game_id: u64, mod_slug: &str) -> ModResult<u64> {
    let mut chain = Chain::new();

    if let Some(id) = chain.step(filter_mods(api, game_id, mod_slug).await)? {
        return Ok(id);
    }
    if let Some(id) = chain.step(search_mods(api, game_id, mod_slug).await)? {
        return Ok(id);
    }
    if let Some(id) = chain.step(global_filter_mods(api, game_id, mod_slug).await)? {
        return Ok(id);
    }
    if let Some(id) = chain.step(global_search_mods(api, game_id, mod_slug).await)? {
        return Ok(id);
    }
    if let Some(id) = chain.step(numeric_lookup(api, game_id, mod_slug).await)? {
        return Ok(id);
    }

    Err(chain.exhausted("while resolving mod"))
}

// ── Game strategies ─────────────────────────────────────

async fn filter_games(api: &ModioClient, slug: &str) -> ModResult<Lookup> {
    let games = api.games_by_name_id(slug).await?;
    Ok(match games.first() {
        Some(game) => Lookup::Found(game.id),
        None => Lookup::Miss,
    })
}

async fn search_games(api: &ModioClient, slug: &str) -> ModResult<Lookup> {
    let games = api.search_games(slug).await?;
    Ok(first_slug_match(&games, slug))
}

// ── Mod strategies ──────────────────────────────────────

async fn filter_mods(api: &ModioClient, game_id: u64, slug: &str) -> ModResult<Lookup> {
    let mods = api.mods_by_name_id(game_id, slug).await?;
    Ok(match mods.first() {
        Some(item) => Lookup::Found(item.id),
        None => Lookup::Miss,
    })
}

async fn search_mods(api: &ModioClient, game_id: u64, slug: &str) -> ModResult<Lookup> {
    let mods = api.search_mods(game_id, slug).await?;
    Ok(first_slug_match(&mods, slug))
}

async fn global_filter_mods(api: &ModioClient, game_id: u64, slug: &str) -> ModResult<Lookup> {
    let mods = api.global_mods_by_name_id(game_id, slug).await?;
    Ok(match mods.first() {
        Some(item) => Lookup::Found(item.id),
        None => Lookup::Miss,
    })
}

async fn global_search_mods(api: &ModioClient, game_id: u64, slug: &str) -> ModResult<Lookup> {
    let mods = api.global_search_mods(slug).await?;
    let hit = mods
        .iter()
        .filter(|item| item.game_id.is_none_or(|gid| gid == game_id))
        .find(|item| item.matches_slug(slug));
    Ok(match hit {
        Some(item) => Lookup::Found(item.id),
        None => Lookup::Miss,
    })
}

async fn numeric_lookup(api: &ModioClient, game_id: u64, slug: &str) -> ModResult<Lookup> {
    let Some(mod_id) = parse_numeric_slug(slug) else {
        return Ok(Lookup::Miss);
    };
    debug!("Trying direct lookup for numeric mod slug {}", mod_id);
    let detail = api.mod_detail(game_id, mod_id).await?;
    Ok(Lookup::Found(detail.id))
}

// ── Helpers ─────────────────────────────────────────────

fn first_slug_match<T: Slugged>(items: &[T], slug: &str) -> Lookup {
    match items.iter().find(|item| item.matches_slug(slug)) {
        Some(item) => Lookup::Found(item.id()),
        None => Lookup::Miss,
    }
}

pub(crate) fn parse_numeric_slug(slug: &str) -> Option<u64> {
    if slug.is_empty() || !slug.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    slug.parse().ok()
}
