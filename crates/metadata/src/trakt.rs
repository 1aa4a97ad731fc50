//! trakt.tv client for cross-references, schedule and ratings.

use serde::Deserialize;
use tracing::debug;

use crate::http::{ensure_success, read_json, transport};
use crate::provider::CrossRefSource;
use crate::MetadataError;

pub const BASE_URL: &str = "https://api.trakt.tv";
const API_VERSION: &str = "2";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TraktIds {
    pub trakt: Option<i64>,
    pub tvdb: Option<i64>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TraktAirs {
    /// English weekday name or "Daily".
    pub day: Option<String>,
    /// Local time as `HH:MM`.
    pub time: Option<String>,
    pub timezone: Option<String>,
}

/// A show summary (`extended=full`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TraktShow {
    pub title: Option<String>,
    pub ids: Option<TraktIds>,
    pub airs: Option<TraktAirs>,
    pub country: Option<String>,
    pub first_aired: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TraktSearchResult {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub show: Option<TraktShow>,
}

pub struct TraktClient {
    client_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl TraktClient {
    pub fn new(client_id: String) -> Self {
        Self {
            client_id,
            base_url: BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        context: &str,
    ) -> Result<T, MetadataError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "trakt request");

        let resp = self
            .client
            .get(&url)
            .query(params)
            .header("trakt-api-key", &self.client_id)
            .header("trakt-api-version", API_VERSION)
            .send()
            .await
            .map_err(|e| transport(context, e))?;
        let resp = ensure_success(resp, context)?;
        read_json(resp, context).await
    }
}

#[async_trait::async_trait]
impl CrossRefSource for TraktClient {
    fn name(&self) -> &str {
        "trakt"
    }

    async fn lookup_tvdb(&self, tvdb_id: i64) -> Result<Vec<TraktSearchResult>, MetadataError> {
        self.get_json(
            &format!("/search/tvdb/{tvdb_id}"),
            &[("type", "show")],
            "show trakt id lookup",
        )
        .await
    }

    async fn summary(&self, trakt_id: i64) -> Result<TraktShow, MetadataError> {
        self.get_json(
            &format!("/shows/{trakt_id}"),
            &[("extended", "full")],
            "get show summary",
        )
        .await
    }
}
