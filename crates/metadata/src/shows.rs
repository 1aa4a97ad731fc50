//! Adding, updating and searching shows.
//!
//! Resolves the trakt link, fetches TheTVDB (falling back to a second
//! language), merges in trakt and Hexagon data and stores the result.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use seriesguide_core::types::EpisodeFlag;
use seriesguide_db::repo::episodes::{self as episode_repo, EpisodeUpsert};
use seriesguide_db::repo::shows as show_repo;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::hexagon::{CloudEpisodeFlags, CloudShow};
use crate::merge::{self, PrimaryShow, TraktDetails};
use crate::provider::{CloudStore, CrossRefSource, ShowSource};
use crate::resolve::{self, TraktLink};
use crate::{EpisodeInfo, MetadataError, SearchResult, ShowRecord};

/// Language for shows added or stored without one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Shows are refreshed if their last update is older than this.
const UPDATE_INTERVAL_MS: i64 = 12 * 60 * 60 * 1000;

/// Season and episode number.
pub type EpisodeNumber = (i32, i32);

/// Episode flags per show TVDB id, taken from a trakt profile.
///
/// JSON form: `{"watched": {"280619": [[1, 1], [1, 2]]}, "collected": {}}`.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct TraktEpisodeFlags {
    pub watched: HashMap<i64, Vec<EpisodeNumber>>,
    pub collected: HashMap<i64, Vec<EpisodeNumber>>,
}

pub struct ShowService {
    pool: SqlitePool,
    tvdb: Arc<dyn ShowSource>,
    trakt: Arc<dyn CrossRefSource>,
    cloud: Option<Arc<dyn CloudStore>>,
    fallback_language: String,
}

impl ShowService {
    pub fn new(
        pool: SqlitePool,
        tvdb: Arc<dyn ShowSource>,
        trakt: Arc<dyn CrossRefSource>,
        fallback_language: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            tvdb,
            trakt,
            cloud: None,
            fallback_language: fallback_language.into(),
        }
    }

    /// Enable the cloud overlay. Its flags then replace trakt episode flags.
    pub fn with_cloud(mut self, cloud: Arc<dyn CloudStore>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    /// True if the stored show was last updated more than 12 hours before `now`.
    pub async fn is_update_due(
        &self,
        tvdb_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, MetadataError> {
        let last_updated = show_repo::get_last_updated(&self.pool, tvdb_id).await?;
        Ok(last_updated.is_some_and(|ts| now.timestamp_millis() - ts > UPDATE_INTERVAL_MS))
    }

    /// Add a show and its episodes. Returns false if the show already exists.
    ///
    /// With the cloud enabled, show properties and episode flags come from it.
    /// Otherwise episode flags are restored from `trakt_flags`.
    pub async fn add_show(
        &self,
        tvdb_id: i64,
        language: Option<&str>,
        trakt_flags: &TraktEpisodeFlags,
    ) -> Result<bool, MetadataError> {
        if show_repo::show_exists(&self.pool, tvdb_id).await? {
            debug!(tvdb_id, "show already exists");
            return Ok(false);
        }

        let show = self.get_show_details_with_cloud(tvdb_id, language).await?;
        let episodes = self.tvdb.get_episodes(tvdb_id, &show.language).await?;

        show_repo::insert_show(&self.pool, &show.to_row(Utc::now().timestamp_millis())).await?;
        self.store_episodes(tvdb_id, &episodes).await?;

        match &self.cloud {
            Some(cloud) => {
                match cloud.download_episode_flags(tvdb_id).await {
                    Ok(flags) => self.store_cloud_flags(tvdb_id, &flags).await?,
                    Err(e) => {
                        // Merged on the next cloud sync instead.
                        warn!(tvdb_id, error = %e, "failed to download episode flags");
                        show_repo::set_merge_complete(&self.pool, tvdb_id, false).await?;
                    }
                }
                if let Err(e) = cloud.send_is_added(tvdb_id, &show.language).await {
                    warn!(tvdb_id, error = %e, "failed to send show to cloud");
                }
            }
            None => {
                self.store_trakt_flags(
                    tvdb_id,
                    trakt_flags.watched.get(&tvdb_id),
                    EpisodeFlag::Watched,
                )
                .await?;
                self.store_trakt_flags(
                    tvdb_id,
                    trakt_flags.collected.get(&tvdb_id),
                    EpisodeFlag::Collected,
                )
                .await?;
            }
        }

        show_repo::update_next_episode(&self.pool, tvdb_id).await?;
        info!(tvdb_id, title = %show.title, episodes = episodes.len(), "show added");
        Ok(true)
    }

    /// Refresh a stored show. Adds new, updates changed and removes orphaned episodes.
    pub async fn update_show(&self, tvdb_id: i64) -> Result<(), MetadataError> {
        let language = show_repo::get_show_language(&self.pool, tvdb_id)
            .await?
            .ok_or_else(|| MetadataError::NotFound(format!("show {tvdb_id} is not stored")))?
            // Legacy rows have no language.
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let show = self.get_show_details(tvdb_id, &language).await?;
        // Episodes in the requested language, which the show might not be available in.
        let episodes = self.tvdb.get_episodes(tvdb_id, &show.language).await?;

        show_repo::update_show(&self.pool, &show.to_row(Utc::now().timestamp_millis())).await?;
        self.store_episodes(tvdb_id, &episodes).await?;
        let keep: Vec<i64> = episodes.iter().map(|ep| ep.tvdb_id).collect();
        let removed = episode_repo::delete_orphaned(&self.pool, tvdb_id, &keep).await?;
        show_repo::update_next_episode(&self.pool, tvdb_id).await?;

        info!(tvdb_id, episodes = episodes.len(), removed, "show updated");
        Ok(())
    }

    /// Like `get_show_details`, but with properties saved in the cloud if enabled.
    /// Without a language, the one saved in the cloud is used, then English.
    pub async fn get_show_details_with_cloud(
        &self,
        tvdb_id: i64,
        language: Option<&str>,
    ) -> Result<ShowRecord, MetadataError> {
        let cloud_show = match &self.cloud {
            Some(cloud) => cloud.get_show(tvdb_id).await.map_err(|e| match e {
                MetadataError::Cloud(_) => e,
                other => MetadataError::Cloud(other.to_string()),
            })?,
            None => None,
        };

        let language = language
            .map(str::to_string)
            .or_else(|| cloud_show.as_ref().and_then(|s| s.language.clone()))
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        self.fetch_show(tvdb_id, &language, cloud_show.as_ref()).await
    }

    /// Show details from TheTVDB in `language`, with schedule and rating from trakt.
    pub async fn get_show_details(
        &self,
        tvdb_id: i64,
        language: &str,
    ) -> Result<ShowRecord, MetadataError> {
        self.fetch_show(tvdb_id, language, None).await
    }

    pub async fn search_series(
        &self,
        query: &str,
        language: &str,
    ) -> Result<Vec<SearchResult>, MetadataError> {
        self.tvdb.search_series(query, language).await
    }

    pub async fn search_show(
        &self,
        query: &str,
        language: Option<&str>,
    ) -> Result<Vec<SearchResult>, MetadataError> {
        self.tvdb.search_show(query, language).await
    }

    async fn fetch_show(
        &self,
        tvdb_id: i64,
        language: &str,
        cloud: Option<&CloudShow>,
    ) -> Result<ShowRecord, MetadataError> {
        // Always look the link up: a TVDB id may have been linked to the wrong
        // trakt entry and fixed since.
        let matches = self.trakt.lookup_tvdb(tvdb_id).await.map_err(secondary)?;
        let link = resolve::resolve_trakt_id(&matches)?;

        let primary = self.download_show(tvdb_id, language).await?;

        let trakt = match link {
            TraktLink::Linked(trakt_id) => {
                let summary = self.trakt.summary(trakt_id).await.map_err(secondary)?;
                Some(TraktDetails { trakt_id, summary })
            }
            TraktLink::NotLinked => {
                warn!(tvdb_id, "no trakt id found, using default values");
                None
            }
        };

        Ok(merge::merge_show(&primary, trakt.as_ref(), cloud))
    }

    /// Fetch in `language`, or in the fallback language if there is no
    /// translation or no posters (404). The result keeps `language` either way.
    async fn download_show(
        &self,
        tvdb_id: i64,
        language: &str,
    ) -> Result<PrimaryShow, MetadataError> {
        let mut series = self.tvdb.get_series(tvdb_id, language).await?;
        let no_translation = series
            .series_name
            .as_deref()
            .is_none_or(|name| name.trim().is_empty());
        if no_translation {
            debug!(
                tvdb_id,
                language,
                fallback = %self.fallback_language,
                "no translation, using fallback"
            );
            series = self.tvdb.get_series(tvdb_id, &self.fallback_language).await?;
        }

        let posters = match self.tvdb.get_posters(tvdb_id, language).await {
            Err(MetadataError::NotFound(_)) => {
                self.tvdb.get_posters(tvdb_id, &self.fallback_language).await
            }
            other => other,
        };
        // An unsuccessful response leaves the poster unset, anything else fails the fetch.
        let poster = match posters {
            Ok(candidates) => merge::select_poster(&candidates),
            Err(e @ (MetadataError::NotFound(_) | MetadataError::Status { .. })) => {
                warn!(tvdb_id, error = %e, "no posters");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(PrimaryShow {
            tvdb_id,
            series,
            language: language.to_string(),
            no_translation,
            poster,
        })
    }

    async fn store_episodes(
        &self,
        tvdb_id: i64,
        episodes: &[EpisodeInfo],
    ) -> Result<(), MetadataError> {
        let rows: Vec<EpisodeUpsert<'_>> = episodes
            .iter()
            .map(|ep| EpisodeUpsert {
                tvdb_id: ep.tvdb_id,
                season: ep.season,
                number: ep.number,
                title: ep.title.as_deref(),
                overview: ep.overview.as_deref(),
                first_aired: ep.first_aired.as_deref(),
            })
            .collect();
        episode_repo::upsert_episodes(&self.pool, tvdb_id, &rows).await?;
        Ok(())
    }

    async fn store_cloud_flags(
        &self,
        tvdb_id: i64,
        flags: &[CloudEpisodeFlags],
    ) -> Result<(), MetadataError> {
        for ep in flags {
            let (season, number) = (ep.season_number, ep.episode_number);
            if ep.is_watched() {
                episode_repo::set_flag(&self.pool, tvdb_id, season, number, EpisodeFlag::Watched, true)
                    .await?;
            }
            if ep.is_in_collection == Some(true) {
                episode_repo::set_flag(&self.pool, tvdb_id, season, number, EpisodeFlag::Collected, true)
                    .await?;
            }
        }
        debug!(tvdb_id, count = flags.len(), "stored cloud episode flags");
        Ok(())
    }

    async fn store_trakt_flags(
        &self,
        tvdb_id: i64,
        numbers: Option<&Vec<EpisodeNumber>>,
        flag: EpisodeFlag,
    ) -> Result<(), MetadataError> {
        let Some(numbers) = numbers else {
            return Ok(());
        };
        for &(season, number) in numbers {
            let matched = episode_repo::set_flag(&self.pool, tvdb_id, season, number, flag, true)
                .await
                .map_err(|e| {
                    MetadataError::Corrupted(format!("storing trakt {flag} episodes failed: {e}"))
                })?;
            if !matched {
                debug!(tvdb_id, season, number, %flag, "trakt flag for unknown episode");
            }
        }
        Ok(())
    }
}

/// trakt failures never mean the show itself is missing.
fn secondary(err: MetadataError) -> MetadataError {
    match err {
        MetadataError::NotFound(context) => MetadataError::Network(format!("trakt {context}")),
        other => other,
    }
}
