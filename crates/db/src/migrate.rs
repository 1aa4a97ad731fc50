use sqlx::SqlitePool;
use tracing::info;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_initial_schema",
        sql: include_str!("../migrations/001_initial_schema.sql"),
    },
    Migration {
        name: "002_settings",
        sql: include_str!("../migrations/002_settings.sql"),
    },
    Migration {
        name: "003_show_sync_state",
        sql: include_str!("../migrations/003_show_sync_state.sql"),
    },
];

/// Apply pending migrations in order. Each one runs in its own transaction
/// together with its `_migrations` entry, so a failure leaves no partial schema.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    apply(pool, MIGRATIONS).await
}

async fn apply(pool: &SqlitePool, migrations: &[Migration]) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let applied: Vec<String> = sqlx::query_scalar("SELECT name FROM _migrations")
        .fetch_all(pool)
        .await?;

    for migration in migrations {
        if applied.iter().any(|name| name == migration.name) {
            continue;
        }

        let mut tx = pool.begin().await?;
        // Files are split on `;`, so literals must not contain one.
        for statement in migration.sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO _migrations (name, applied_at) VALUES (?, ?)")
            .bind(migration.name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(migration = migration.name, "migration applied");
    }

    Ok(())
}
