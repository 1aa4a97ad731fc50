//! Client for the Hexagon cloud backend holding per-user show state.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{ensure_success, read_json};
use crate::provider::CloudStore;
use crate::MetadataError;

/// Saved state of a show. Absent fields were never set by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudShow {
    pub tvdb_id: i64,
    pub is_favorite: Option<bool>,
    pub notify: Option<bool>,
    pub is_hidden: Option<bool>,
    pub language: Option<String>,
}

/// Watched state 1 means watched, 2 skipped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudEpisodeFlags {
    pub season_number: i32,
    pub episode_number: i32,
    pub watched_flag: Option<i32>,
    pub is_in_collection: Option<bool>,
}

impl CloudEpisodeFlags {
    pub fn is_watched(&self) -> bool {
        self.watched_flag == Some(1)
    }
}

#[derive(Deserialize)]
struct EpisodeList {
    #[serde(default)]
    episodes: Vec<CloudEpisodeFlags>,
    cursor: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowUpload<'a> {
    tvdb_id: i64,
    is_removed: bool,
    language: &'a str,
}

#[derive(Serialize)]
struct ShowList<'a> {
    shows: Vec<ShowUpload<'a>>,
}

pub struct HexagonClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HexagonClient {
    pub fn new(base_url: impl Into<String>, token: String) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        context: &str,
    ) -> Result<T, MetadataError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "hexagon request");

        let resp = self
            .client
            .get(&url)
            .query(params)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| MetadataError::Cloud(format!("{context}: {e}")))?;
        let resp = ensure_success(resp, context)?;
        read_json(resp, context).await
    }
}

fn cloud(err: MetadataError) -> MetadataError {
    match err {
        MetadataError::Cloud(_) => err,
        other => MetadataError::Cloud(other.to_string()),
    }
}

#[async_trait::async_trait]
impl CloudStore for HexagonClient {
    fn name(&self) -> &str {
        "hexagon"
    }

    async fn get_show(&self, tvdb_id: i64) -> Result<Option<CloudShow>, MetadataError> {
        let id = tvdb_id.to_string();
        match self
            .get_json("/shows/v1/show", &[("showTvdbId", id.as_str())], "get show details")
            .await
        {
            Ok(show) => Ok(Some(show)),
            Err(MetadataError::NotFound(_)) => Ok(None),
            Err(e) => Err(cloud(e)),
        }
    }

    async fn download_episode_flags(
        &self,
        tvdb_id: i64,
    ) -> Result<Vec<CloudEpisodeFlags>, MetadataError> {
        let id = tvdb_id.to_string();
        let mut flags = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = vec![("showTvdbId", id.as_str())];
            if let Some(ref c) = cursor {
                params.push(("cursor", c.as_str()));
            }
            let page: EpisodeList = self
                .get_json("/episodes/v1/episodes", &params, "download episode flags")
                .await
                .map_err(cloud)?;
            let done = page.episodes.is_empty();
            flags.extend(page.episodes);
            match page.cursor {
                Some(next) if !done && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next)
                }
                _ => break,
            }
        }
        debug!(tvdb_id, count = flags.len(), "downloaded episode flags");
        Ok(flags)
    }

    async fn send_is_added(&self, tvdb_id: i64, language: &str) -> Result<(), MetadataError> {
        let url = format!("{}/shows/v1/shows/save", self.base_url);
        let body = ShowList {
            shows: vec![ShowUpload {
                tvdb_id,
                is_removed: false,
                language,
            }],
        };
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| MetadataError::Cloud(format!("send is added: {e}")))?;
        ensure_success(resp, "send is added").map_err(cloud)?;
        Ok(())
    }
}
