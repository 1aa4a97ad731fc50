use sqlx::SqlitePool;

use seriesguide_db::repo::settings;
use seriesguide_metadata::shows::DEFAULT_LANGUAGE;

/// Runtime configuration, read from `SG_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub tvdb_api_key: String,
    pub trakt_client_id: String,
    pub tvdb_url: Option<String>,
    pub tvdb_xml_url: Option<String>,
    pub trakt_url: Option<String>,
    /// Set only if both the Hexagon URL and a user token are given.
    pub hexagon: Option<HexagonConfig>,
    pub fallback_language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HexagonConfig {
    pub url: String,
    pub token: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let hexagon = match (get("SG_HEXAGON_URL"), get("SG_HEXAGON_TOKEN")) {
            (Some(url), Some(token)) => Some(HexagonConfig { url, token }),
            _ => None,
        };

        Self {
            db_path: get("SG_DB").unwrap_or_else(|| "seriesguide.db".to_string()),
            tvdb_api_key: get("SG_TVDB_API_KEY").unwrap_or_default(),
            trakt_client_id: get("SG_TRAKT_CLIENT_ID").unwrap_or_default(),
            tvdb_url: get("SG_TVDB_URL"),
            tvdb_xml_url: get("SG_TVDB_XML_URL"),
            trakt_url: get("SG_TRAKT_URL"),
            hexagon,
            fallback_language: get("SG_FALLBACK_LANGUAGE"),
        }
    }

    /// The environment wins over the stored setting, which wins over English.
    pub async fn resolve_fallback_language(&self, pool: &SqlitePool) -> Result<String, sqlx::Error> {
        if let Some(language) = &self.fallback_language {
            return Ok(language.clone());
        }
        let stored = settings::get(pool, settings::SHOWS_LANGUAGE_FALLBACK).await?;
        Ok(stored
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()))
    }
}
