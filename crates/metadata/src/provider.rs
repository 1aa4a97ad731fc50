//! Seams between the show service and the remote sources.

use crate::hexagon::{CloudEpisodeFlags, CloudShow};
use crate::trakt::{TraktSearchResult, TraktShow};
use crate::tvdb::{PosterCandidate, TvdbSeries};
use crate::{EpisodeInfo, MetadataError, SearchResult};

/// The primary show metadata provider.
#[async_trait::async_trait]
pub trait ShowSource: Send + Sync {
    fn name(&self) -> &str;

    /// Get a show in the given language. The title is empty or missing if
    /// no translation exists.
    async fn get_series(&self, tvdb_id: i64, language: &str) -> Result<TvdbSeries, MetadataError>;

    /// Poster candidates in the given language. `NotFound` if there are none.
    async fn get_posters(
        &self,
        tvdb_id: i64,
        language: &str,
    ) -> Result<Vec<PosterCandidate>, MetadataError>;

    /// All episodes of a show.
    async fn get_episodes(
        &self,
        tvdb_id: i64,
        language: &str,
    ) -> Result<Vec<EpisodeInfo>, MetadataError>;

    async fn search_series(
        &self,
        query: &str,
        language: &str,
    ) -> Result<Vec<SearchResult>, MetadataError>;

    /// Keyword search. With no language, results in all languages are returned.
    async fn search_show(
        &self,
        query: &str,
        language: Option<&str>,
    ) -> Result<Vec<SearchResult>, MetadataError>;
}

/// The secondary ratings and schedule provider.
#[async_trait::async_trait]
pub trait CrossRefSource: Send + Sync {
    fn name(&self) -> &str;

    /// Raw matches for a TVDB id. See `resolve::resolve_trakt_id`.
    async fn lookup_tvdb(&self, tvdb_id: i64) -> Result<Vec<TraktSearchResult>, MetadataError>;

    async fn summary(&self, trakt_id: i64) -> Result<TraktShow, MetadataError>;
}

/// Per-user saved state.
#[async_trait::async_trait]
pub trait CloudStore: Send + Sync {
    fn name(&self) -> &str;

    /// `None` if the user never added the show.
    async fn get_show(&self, tvdb_id: i64) -> Result<Option<CloudShow>, MetadataError>;

    async fn download_episode_flags(
        &self,
        tvdb_id: i64,
    ) -> Result<Vec<CloudEpisodeFlags>, MetadataError>;

    /// Mark the show as added, so other devices add it too.
    async fn send_is_added(&self, tvdb_id: i64, language: &str) -> Result<(), MetadataError>;
}
