// ─── mod.io API models ───
// Only the fields the pipeline consumes; everything else in the
// response body is ignored by serde.

use serde::Deserialize;

/// Response envelope for list endpoints: `{"data": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct DataPage<T> {
    #[serde(default)]
    pub data: Vec<T>,
}

/// A game as returned by `/games` and `/games/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Game {
    pub id: u64,
    #[serde(default)]
    pub name_id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A mod as returned by `/games/{id}/mods` and `/mods`.
#[derive(Debug, Clone, Deserialize)]
pub struct Mod {
    pub id: u64,
    #[serde(default)]
    pub game_id: Option<u64>,
    #[serde(default)]
    pub name_id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One published build of a mod, from `/games/{id}/mods/{id}/files`.
///
/// Files are totally ordered by `date_added` (epoch seconds); the
/// selector treats a missing timestamp as unusable rather than zero.
#[derive(Debug, Clone, Deserialize)]
pub struct ModFile {
    pub id: u64,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub date_added: Option<i64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub download: Option<FileDownload>,
}

/// Binary location descriptor nested in a mod file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileDownload {
    #[serde(default)]
    pub binary_url: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
}

/// Anything addressable by a human slug: games and mods both carry a
/// `name_id` plus an alternate `slug` field on some API surfaces.
pub trait Slugged {
    fn id(&self) -> u64;
    fn name_id(&self) -> Option<&str>;
    fn alt_slug(&self) -> Option<&str>;

    /// Case-insensitive match against either slug field.
    fn matches_slug(&self, slug: &str) -> bool {
        let hit = |candidate: Option<&str>| {
            candidate.is_some_and(|value| value.eq_ignore_ascii_case(slug))
        };
        hit(self.name_id()) || hit(self.alt_slug())
    }
}

impl Slugged for Game {
    fn id(&self) -> u64 {
        self.id
    }
    fn name_id(&self) -> Option<&str> {
        self.name_id.as_deref()
    }
    fn alt_slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

impl Slugged for Mod {
    fn id(&self) -> u64 {
        self.id
    }
    fn name_id(&self) -> Option<&str> {
        self.name_id.as_deref()
    }
    fn alt_slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_mod_file() {
        let json = r#"{
            "id": 125936,
            "version": "1.0.2",
            "date_added": 1499841487,
            "filename": "rogue-knight-v1.zip",
            "filesize": 15181,
            "download": {
                "binary_url": "https:\/\/api.mod.io\/v1\/games\/1\/mods\/1\/files\/1\/download",
                "filesize": 15181
            }
        }"#;
        let file: ModFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, 125936);
        assert_eq!(file.date_added, Some(1499841487));
        assert_eq!(file.filesize, Some(15181));
        assert!(file.download.unwrap().binary_url.unwrap().contains("download"));
    }

    #[test]
    fn deserialize_envelope_tolerates_missing_data() {
        let page: DataPage<Game> = serde_json::from_str("{}").unwrap();
        assert!(page.data.is_empty());
    }

    #[test]
    fn slug_match_is_case_insensitive() {
        let game: Game = serde_json::from_str(
            r#"{"id": 51, "name_id": "Space-Engineers", "name": "Space Engineers"}"#,
        )
        .unwrap();
        assert!(game.matches_slug("space-engineers"));
        assert!(!game.matches_slug("space"));
    }

    #[test]
    fn slug_match_falls_back_to_alternate_field() {
        let item: Mod =
            serde_json::from_str(r#"{"id": 7, "slug": "assault-weapons-pack1"}"#).unwrap();
        assert!(item.matches_slug("ASSAULT-WEAPONS-PACK1"));
    }
}
