pub mod hexagon;
mod http;
pub mod merge;
pub mod provider;
pub mod resolve;
pub mod shows;
pub mod trakt;
pub mod tvdb;

use seriesguide_core::error::ErrorKind;
use seriesguide_core::types::ShowStatus;
use seriesguide_db::repo::shows::ShowRow;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    /// The remote item does not exist (any longer).
    #[error("not found: {0}")]
    NotFound(String),
    #[error("network error: {0}")]
    Network(String),
    /// The server answered with a non-2xx status other than 404.
    #[error("{context}: unexpected status {status}")]
    Status { context: String, status: u16 },
    #[error("corrupted response: {0}")]
    Corrupted(String),
    #[error("cloud error: {0}")]
    Cloud(String),
    #[error("db error: {0}")]
    Db(#[from] sqlx::Error),
}

impl MetadataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Network(_) | Self::Status { .. } => ErrorKind::TransientNetwork,
            Self::Corrupted(_) => ErrorKind::DataCorruption,
            Self::Cloud(_) => ErrorKind::CloudFailure,
            Self::Db(_) => ErrorKind::Storage,
        }
    }
}

/// Canonical, merged representation of a show.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShowRecord {
    pub tvdb_id: i64,
    pub slug: Option<String>,
    pub title: String,
    pub overview: String,
    pub network: Option<String>,
    pub content_rating: Option<String>,
    pub imdb_id: Option<String>,
    pub genres: Vec<String>,
    /// The requested language, which is not necessarily the language of the content.
    pub language: String,
    pub runtime: i32,
    pub status: ShowStatus,
    pub rating: f64,
    pub trakt_id: Option<i64>,
    pub poster: Option<String>,
    pub last_edited: i64,
    /// Local air time encoded as `hour * 100 + minute`, -1 if unknown.
    pub release_time: i32,
    /// ISO weekday (1 = Monday), 0 for daily shows, -1 if unknown.
    pub release_weekday: i32,
    pub release_timezone: Option<String>,
    pub country: Option<String>,
    pub first_aired: String,
    pub favorite: bool,
    pub notify: bool,
    pub hidden: bool,
}

impl ShowRecord {
    pub fn to_row(&self, last_updated: i64) -> ShowRow {
        ShowRow {
            tvdb_id: self.tvdb_id,
            slug: self.slug.clone(),
            title: self.title.clone(),
            overview: self.overview.clone(),
            network: self.network.clone(),
            content_rating: self.content_rating.clone(),
            imdb_id: self.imdb_id.clone(),
            // A list of strings always serializes.
            genres: serde_json::to_string(&self.genres).unwrap_or_else(|_| "[]".to_string()),
            language: Some(self.language.clone()),
            runtime: self.runtime,
            status: self.status.as_str().to_string(),
            rating: self.rating,
            trakt_id: self.trakt_id,
            poster: self.poster.clone(),
            last_edited: self.last_edited,
            release_time: self.release_time,
            release_weekday: self.release_weekday,
            release_timezone: self.release_timezone.clone(),
            country: self.country.clone(),
            first_aired: self.first_aired.clone(),
            favorite: self.favorite,
            notify: self.notify,
            hidden: self.hidden,
            last_updated,
            hexagon_merge_complete: true,
            next_episode: None,
        }
    }

    pub fn from_row(row: ShowRow) -> Result<Self, MetadataError> {
        let genres = serde_json::from_str(&row.genres)
            .map_err(|e| MetadataError::Corrupted(format!("stored genres: {e}")))?;
        let status = row
            .status
            .parse()
            .map_err(|e| MetadataError::Corrupted(format!("stored status: {e}")))?;
        Ok(Self {
            tvdb_id: row.tvdb_id,
            slug: row.slug,
            title: row.title,
            overview: row.overview,
            network: row.network,
            content_rating: row.content_rating,
            imdb_id: row.imdb_id,
            genres,
            language: row.language.unwrap_or_default(),
            runtime: row.runtime,
            status,
            rating: row.rating,
            trakt_id: row.trakt_id,
            poster: row.poster,
            last_edited: row.last_edited,
            release_time: row.release_time,
            release_weekday: row.release_weekday,
            release_timezone: row.release_timezone,
            country: row.country,
            first_aired: row.first_aired,
            favorite: row.favorite,
            notify: row.notify,
            hidden: row.hidden,
        })
    }
}

/// A show found by a search query. Not persisted.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchResult {
    pub tvdb_id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub language: String,
}

/// Episode metadata from the primary source.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EpisodeInfo {
    pub tvdb_id: i64,
    pub season: i32,
    pub number: i32,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub first_aired: Option<String>,
}
