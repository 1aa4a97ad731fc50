use sqlx::SqlitePool;

/// A row of the `show` table.
///
/// `genres` holds a JSON array, `status` the text form of
/// `seriesguide_core::types::ShowStatus`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct ShowRow {
    pub tvdb_id: i64,
    pub slug: Option<String>,
    pub title: String,
    pub overview: String,
    pub network: Option<String>,
    pub content_rating: Option<String>,
    pub imdb_id: Option<String>,
    pub genres: String,
    pub language: Option<String>,
    pub runtime: i32,
    pub status: String,
    pub rating: f64,
    pub trakt_id: Option<i64>,
    pub poster: Option<String>,
    pub last_edited: i64,
    pub release_time: i32,
    pub release_weekday: i32,
    pub release_timezone: Option<String>,
    pub country: Option<String>,
    pub first_aired: String,
    pub favorite: bool,
    pub notify: bool,
    pub hidden: bool,
    pub last_updated: i64,
    pub hexagon_merge_complete: bool,
    pub next_episode: Option<i64>,
}

const SHOW_COLUMNS: &str = "tvdb_id, slug, title, overview, network, content_rating, imdb_id, \
     genres, language, runtime, status, rating, trakt_id, poster, last_edited, release_time, \
     release_weekday, release_timezone, country, first_aired, favorite, notify, hidden, \
     last_updated, hexagon_merge_complete, next_episode";

pub async fn show_exists(pool: &SqlitePool, tvdb_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT tvdb_id FROM show WHERE tvdb_id = ?")
        .bind(tvdb_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn get_show(pool: &SqlitePool, tvdb_id: i64) -> Result<Option<ShowRow>, sqlx::Error> {
    let query = format!("SELECT {SHOW_COLUMNS} FROM show WHERE tvdb_id = ?");
    sqlx::query_as::<_, ShowRow>(&query)
        .bind(tvdb_id)
        .fetch_optional(pool)
        .await
}

/// Insert a newly added show, including its user flags.
pub async fn insert_show(pool: &SqlitePool, show: &ShowRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO show (tvdb_id, slug, title, overview, network, content_rating, imdb_id, \
         genres, language, runtime, status, rating, trakt_id, poster, last_edited, release_time, \
         release_weekday, release_timezone, country, first_aired, favorite, notify, hidden, \
         last_updated, hexagon_merge_complete, next_episode) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(show.tvdb_id)
    .bind(&show.slug)
    .bind(&show.title)
    .bind(&show.overview)
    .bind(&show.network)
    .bind(&show.content_rating)
    .bind(&show.imdb_id)
    .bind(&show.genres)
    .bind(&show.language)
    .bind(show.runtime)
    .bind(&show.status)
    .bind(show.rating)
    .bind(show.trakt_id)
    .bind(&show.poster)
    .bind(show.last_edited)
    .bind(show.release_time)
    .bind(show.release_weekday)
    .bind(&show.release_timezone)
    .bind(&show.country)
    .bind(&show.first_aired)
    .bind(show.favorite)
    .bind(show.notify)
    .bind(show.hidden)
    .bind(show.last_updated)
    .bind(show.hexagon_merge_complete)
    .bind(show.next_episode)
    .execute(pool)
    .await?;
    Ok(())
}

/// Refresh the remote metadata of an existing show.
///
/// User state (favorite, notify, hidden, merge state, next episode) is left alone.
/// Returns false if no such show exists.
pub async fn update_show(pool: &SqlitePool, show: &ShowRow) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE show SET slug = ?, title = ?, overview = ?, network = ?, content_rating = ?, \
         imdb_id = ?, genres = ?, language = ?, runtime = ?, status = ?, rating = ?, \
         trakt_id = ?, poster = ?, last_edited = ?, release_time = ?, release_weekday = ?, \
         release_timezone = ?, country = ?, first_aired = ?, last_updated = ? \
         WHERE tvdb_id = ?",
    )
    .bind(&show.slug)
    .bind(&show.title)
    .bind(&show.overview)
    .bind(&show.network)
    .bind(&show.content_rating)
    .bind(&show.imdb_id)
    .bind(&show.genres)
    .bind(&show.language)
    .bind(show.runtime)
    .bind(&show.status)
    .bind(show.rating)
    .bind(show.trakt_id)
    .bind(&show.poster)
    .bind(show.last_edited)
    .bind(show.release_time)
    .bind(show.release_weekday)
    .bind(&show.release_timezone)
    .bind(&show.country)
    .bind(&show.first_aired)
    .bind(show.last_updated)
    .bind(show.tvdb_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Stored language of a show. Outer `None` if the show does not exist.
pub async fn get_show_language(
    pool: &SqlitePool,
    tvdb_id: i64,
) -> Result<Option<Option<String>>, sqlx::Error> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT language FROM show WHERE tvdb_id = ?")
            .bind(tvdb_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(language,)| language))
}

/// Millisecond timestamp of the last successful update.
pub async fn get_last_updated(pool: &SqlitePool, tvdb_id: i64) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT last_updated FROM show WHERE tvdb_id = ?")
        .bind(tvdb_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(ts,)| ts))
}

/// Flag whether the episode flags of a show were merged with the cloud.
pub async fn set_merge_complete(
    pool: &SqlitePool,
    tvdb_id: i64,
    complete: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE show SET hexagon_merge_complete = ? WHERE tvdb_id = ?")
        .bind(complete)
        .bind(tvdb_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_show_ids(pool: &SqlitePool) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT tvdb_id FROM show ORDER BY tvdb_id")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Recompute the episode to watch next: the first unwatched regular episode
/// after the highest watched one. Specials (season 0) are skipped.
pub async fn update_next_episode(
    pool: &SqlitePool,
    tvdb_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    let last_watched: Option<(i32, i32)> = sqlx::query_as(
        "SELECT season, number FROM episode \
         WHERE show_tvdb_id = ? AND watched = 1 AND season > 0 \
         ORDER BY season DESC, number DESC LIMIT 1",
    )
    .bind(tvdb_id)
    .fetch_optional(pool)
    .await?;
    let (season, number) = last_watched.unwrap_or((0, 0));

    let next: Option<(i64,)> = sqlx::query_as(
        "SELECT tvdb_id FROM episode \
         WHERE show_tvdb_id = ? AND watched = 0 AND season > 0 \
         AND (season > ? OR (season = ? AND number > ?)) \
         ORDER BY season, number LIMIT 1",
    )
    .bind(tvdb_id)
    .bind(season)
    .bind(season)
    .bind(number)
    .fetch_optional(pool)
    .await?;
    let next = next.map(|(id,)| id);

    sqlx::query("UPDATE show SET next_episode = ? WHERE tvdb_id = ?")
        .bind(next)
        .bind(tvdb_id)
        .execute(pool)
        .await?;

    Ok(next)
}
