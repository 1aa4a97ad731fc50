use sqlx::SqlitePool;

/// Language used when a show has no translation in the requested one.
pub const SHOWS_LANGUAGE_FALLBACK: &str = "shows_language_fallback";

/// Get a setting value by key.
pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(v,)| v))
}

/// Set a setting value (upsert).
pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert defaults for keys that are not set yet.
pub async fn insert_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let defaults = [(SHOWS_LANGUAGE_FALLBACK, "en")];
    for (key, value) in defaults {
        sqlx::query(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::shows::tests::test_pool;

    #[tokio::test]
    async fn defaults_do_not_override() {
        let pool = test_pool().await;
        set(&pool, SHOWS_LANGUAGE_FALLBACK, "de").await.unwrap();
        insert_defaults(&pool).await.unwrap();
        assert_eq!(
            get(&pool, SHOWS_LANGUAGE_FALLBACK).await.unwrap().as_deref(),
            Some("de")
        );
        assert_eq!(get(&pool, "missing").await.unwrap(), None);
    }
}
