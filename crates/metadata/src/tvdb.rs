//! TheTVDB provider client.
//!
//! Uses the JSON API v2 for show details, posters, episodes and search, and
//! the legacy XML API for keyword search across languages.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::http::{ensure_success, read_json, transport};
use crate::provider::ShowSource;
use crate::{EpisodeInfo, MetadataError, SearchResult};

pub const BASE_URL: &str = "https://api.thetvdb.com";
pub const XML_BASE_URL: &str = "https://www.thetvdb.com/api";

/// A show as returned by `GET /series/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvdbSeries {
    pub id: i64,
    pub series_name: Option<String>,
    pub slug: Option<String>,
    pub overview: Option<String>,
    pub network: Option<String>,
    /// Content rating, e.g. "TV-14".
    pub rating: Option<String>,
    pub imdb_id: Option<String>,
    pub genre: Option<Vec<String>>,
    pub runtime: Option<String>,
    pub status: Option<String>,
    pub last_updated: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterCandidate {
    pub file_name: String,
    pub ratings_info: Option<RatingsInfo>,
}

impl PosterCandidate {
    pub fn average_rating(&self) -> Option<f64> {
        self.ratings_info.as_ref().and_then(|r| r.average)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RatingsInfo {
    pub average: Option<f64>,
    pub count: Option<i64>,
}

#[derive(Deserialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct EpisodesPage {
    links: Option<PageLinks>,
    #[serde(default)]
    data: Vec<TvdbEpisode>,
}

#[derive(Deserialize)]
struct PageLinks {
    next: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbEpisode {
    id: i64,
    aired_season: Option<i32>,
    aired_episode_number: Option<i32>,
    episode_name: Option<String>,
    overview: Option<String>,
    first_aired: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TvdbSearchHit {
    id: i64,
    series_name: Option<String>,
    overview: Option<String>,
}

pub struct TvdbClient {
    api_key: String,
    base_url: String,
    xml_base_url: String,
    client: reqwest::Client,
    token: OnceCell<String>,
}

impl TvdbClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            xml_base_url: XML_BASE_URL.to_string(),
            client: reqwest::Client::new(),
            token: OnceCell::new(),
        }
    }

    pub fn with_base_urls(
        mut self,
        base_url: impl Into<String>,
        xml_base_url: impl Into<String>,
    ) -> Self {
        self.base_url = base_url.into();
        self.xml_base_url = xml_base_url.into();
        self
    }

    /// JWT for the v2 API, fetched once per client.
    async fn token(&self) -> Result<&str, MetadataError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let url = format!("{}/login", self.base_url);
                let resp = self
                    .client
                    .post(&url)
                    .json(&serde_json::json!({ "apikey": self.api_key }))
                    .send()
                    .await
                    .map_err(|e| transport("login", e))?;
                let resp = ensure_success(resp, "login")?;
                let body: TokenResponse = read_json(resp, "login").await?;
                Ok::<_, MetadataError>(body.token)
            })
            .await?;
        Ok(token.as_str())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        language: Option<&str>,
        context: &str,
    ) -> Result<T, MetadataError> {
        let token = self.token().await?;
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, ?language, "TVDB request");

        let mut req = self.client.get(&url).query(params).bearer_auth(token);
        if let Some(language) = language {
            req = req.header(reqwest::header::ACCEPT_LANGUAGE, language);
        }
        let resp = req.send().await.map_err(|e| transport(context, e))?;
        let resp = ensure_success(resp, context)?;
        read_json(resp, context).await
    }
}

#[async_trait::async_trait]
impl ShowSource for TvdbClient {
    fn name(&self) -> &str {
        "tvdb"
    }

    async fn get_series(&self, tvdb_id: i64, language: &str) -> Result<TvdbSeries, MetadataError> {
        let resp: DataResponse<TvdbSeries> = self
            .get_json(&format!("/series/{tvdb_id}"), &[], Some(language), "getSeries")
            .await?;
        Ok(resp.data)
    }

    async fn get_posters(
        &self,
        tvdb_id: i64,
        language: &str,
    ) -> Result<Vec<PosterCandidate>, MetadataError> {
        let resp: DataResponse<Vec<PosterCandidate>> = self
            .get_json(
                &format!("/series/{tvdb_id}/images/query"),
                &[("keyType", "poster")],
                Some(language),
                "getSeriesPosters",
            )
            .await?;
        Ok(resp.data)
    }

    async fn get_episodes(
        &self,
        tvdb_id: i64,
        language: &str,
    ) -> Result<Vec<EpisodeInfo>, MetadataError> {
        let path = format!("/series/{tvdb_id}/episodes");
        let mut episodes = Vec::new();
        let mut page = 1u32;
        loop {
            let page_str = page.to_string();
            let result: Result<EpisodesPage, _> = self
                .get_json(&path, &[("page", page_str.as_str())], Some(language), "getEpisodes")
                .await;
            let body = match result {
                Ok(body) => body,
                // Shows without any episodes have no first page.
                Err(MetadataError::NotFound(_)) if page == 1 => break,
                Err(e) => return Err(e),
            };

            episodes.extend(body.data.into_iter().map(|ep| EpisodeInfo {
                tvdb_id: ep.id,
                season: ep.aired_season.unwrap_or(0),
                number: ep.aired_episode_number.unwrap_or(0),
                title: ep.episode_name.filter(|s| !s.is_empty()),
                overview: ep.overview.filter(|s| !s.is_empty()),
                first_aired: ep.first_aired.filter(|s| !s.is_empty()),
            }));

            match body.links.and_then(|l| l.next) {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }
        debug!(tvdb_id, count = episodes.len(), "fetched episodes");
        Ok(episodes)
    }

    async fn search_series(
        &self,
        query: &str,
        language: &str,
    ) -> Result<Vec<SearchResult>, MetadataError> {
        let result: Result<DataResponse<Option<Vec<TvdbSearchHit>>>, _> = self
            .get_json("/search/series", &[("name", query)], Some(language), "searchSeries")
            .await;
        let hits = match result {
            Ok(resp) => resp.data.unwrap_or_default(),
            // The API answers 404 if there are no search results.
            Err(MetadataError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                tvdb_id: hit.id,
                title: hit.series_name.unwrap_or_default(),
                overview: hit.overview,
                language: language.to_string(),
            })
            .collect())
    }

    async fn search_show(
        &self,
        query: &str,
        language: Option<&str>,
    ) -> Result<Vec<SearchResult>, MetadataError> {
        let url = format!("{}/GetSeries.php", self.xml_base_url);
        debug!(url = %url, query, ?language, "TVDB XML search");

        let resp = self
            .client
            .get(&url)
            .query(&[("seriesname", query), ("language", language.unwrap_or("all"))])
            .send()
            .await
            .map_err(|e| transport("searchShow", e))?;
        let resp = ensure_success(resp, "searchShow")?;
        let body = resp.text().await.map_err(|e| transport("searchShow", e))?;

        parse_search_xml(&body, language)
    }
}

/// Parse a `GetSeries.php` response, keeping only shows in `language`
/// (all shows if `None`).
pub fn parse_search_xml(
    xml: &str,
    language: Option<&str>,
) -> Result<Vec<SearchResult>, MetadataError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut results = Vec::new();
    let mut current: Option<SeriesBuilder> = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "Series" {
                    current = Some(SeriesBuilder::default());
                }
                current_element = name;
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"Series" {
                    if let Some(result) = current.take().map(SeriesBuilder::build).transpose()? {
                        if language.is_none_or(|l| l == result.language) {
                            results.push(result);
                        }
                    }
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(ref mut series) = current {
                    let text = e
                        .unescape()
                        .map_err(|e| MetadataError::Corrupted(format!("searchShow: {e}")))?;
                    series.set(&current_element, text.trim());
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(ref mut series) = current {
                    let text = String::from_utf8_lossy(&e).to_string();
                    series.set(&current_element, text.trim());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MetadataError::Corrupted(format!(
                    "searchShow: XML parse error: {e}"
                )))
            }
            _ => {}
        }
    }

    Ok(results)
}

#[derive(Default)]
struct SeriesBuilder {
    id: Option<String>,
    language: Option<String>,
    title: Option<String>,
    overview: Option<String>,
}

impl SeriesBuilder {
    fn set(&mut self, element: &str, text: &str) {
        let slot = match element {
            "id" => &mut self.id,
            "language" => &mut self.language,
            "SeriesName" => &mut self.title,
            "Overview" => &mut self.overview,
            _ => return,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    fn build(self) -> Result<SearchResult, MetadataError> {
        let id = self
            .id
            .ok_or_else(|| MetadataError::Corrupted("searchShow: series without id".into()))?;
        let tvdb_id = id
            .parse()
            .map_err(|_| MetadataError::Corrupted(format!("searchShow: invalid id {id:?}")))?;
        Ok(SearchResult {
            tvdb_id,
            title: self.title.unwrap_or_default(),
            overview: self.overview.filter(|s| !s.is_empty()),
            language: self.language.unwrap_or_default(),
        })
    }
}
