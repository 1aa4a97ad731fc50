use std::collections::HashSet;

use seriesguide_core::types::EpisodeFlag;
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct EpisodeRow {
    pub tvdb_id: i64,
    pub show_tvdb_id: i64,
    pub season: i32,
    pub number: i32,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub first_aired: Option<String>,
    pub watched: bool,
    pub collected: bool,
}

/// Remote fields of an episode, without user flags.
#[derive(Debug, Clone)]
pub struct EpisodeUpsert<'a> {
    pub tvdb_id: i64,
    pub season: i32,
    pub number: i32,
    pub title: Option<&'a str>,
    pub overview: Option<&'a str>,
    pub first_aired: Option<&'a str>,
}

/// Insert or update all episodes of a show in one transaction.
/// Watched and collected flags of existing rows are kept.
pub async fn upsert_episodes(
    pool: &SqlitePool,
    show_tvdb_id: i64,
    episodes: &[EpisodeUpsert<'_>],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for ep in episodes {
        sqlx::query(
            "INSERT INTO episode (tvdb_id, show_tvdb_id, season, number, title, overview, first_aired) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(tvdb_id) DO UPDATE SET \
             season = excluded.season, \
             number = excluded.number, \
             title = excluded.title, \
             overview = excluded.overview, \
             first_aired = excluded.first_aired",
        )
        .bind(ep.tvdb_id)
        .bind(show_tvdb_id)
        .bind(ep.season)
        .bind(ep.number)
        .bind(ep.title)
        .bind(ep.overview)
        .bind(ep.first_aired)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Delete episodes of a show that are not in `keep`. Returns how many were removed.
pub async fn delete_orphaned(
    pool: &SqlitePool,
    show_tvdb_id: i64,
    keep: &[i64],
) -> Result<u64, sqlx::Error> {
    let keep: HashSet<i64> = keep.iter().copied().collect();
    let existing: Vec<(i64,)> = sqlx::query_as("SELECT tvdb_id FROM episode WHERE show_tvdb_id = ?")
        .bind(show_tvdb_id)
        .fetch_all(pool)
        .await?;

    let mut tx = pool.begin().await?;
    let mut removed = 0;
    for (id,) in existing.into_iter().filter(|(id,)| !keep.contains(id)) {
        removed += sqlx::query("DELETE FROM episode WHERE tvdb_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;
    Ok(removed)
}

pub async fn get_episodes(
    pool: &SqlitePool,
    show_tvdb_id: i64,
) -> Result<Vec<EpisodeRow>, sqlx::Error> {
    sqlx::query_as::<_, EpisodeRow>(
        "SELECT tvdb_id, show_tvdb_id, season, number, title, overview, first_aired, watched, collected \
         FROM episode WHERE show_tvdb_id = ? ORDER BY season, number",
    )
    .bind(show_tvdb_id)
    .fetch_all(pool)
    .await
}

/// Set a flag on the episode identified by season and number.
/// Returns false if the show has no such episode.
pub async fn set_flag(
    pool: &SqlitePool,
    show_tvdb_id: i64,
    season: i32,
    number: i32,
    flag: EpisodeFlag,
    value: bool,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        "UPDATE episode SET {} = ? WHERE show_tvdb_id = ? AND season = ? AND number = ?",
        flag.column()
    );
    let result = sqlx::query(&query)
        .bind(value)
        .bind(show_tvdb_id)
        .bind(season)
        .bind(number)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
