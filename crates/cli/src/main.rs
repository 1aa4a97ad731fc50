mod config;
mod retry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use seriesguide_core::error::ErrorKind;
use seriesguide_db::repo::{settings, shows as show_repo};
use seriesguide_metadata::hexagon::HexagonClient;
use seriesguide_metadata::shows::{ShowService, TraktEpisodeFlags};
use seriesguide_metadata::trakt::{self, TraktClient};
use seriesguide_metadata::tvdb::{self, TvdbClient};
use seriesguide_metadata::ShowRecord;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "seriesguide", about = "Track TV shows with TheTVDB and trakt metadata")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a show and its episodes
    Add {
        tvdb_id: i64,
        #[arg(long)]
        language: Option<String>,
        /// JSON file with trakt watched/collected episodes to restore
        /// (ignored when Hexagon is enabled)
        #[arg(long, value_name = "FILE")]
        trakt_flags: Option<PathBuf>,
    },
    /// Refresh a stored show
    Update { tvdb_id: i64 },
    /// Refresh every show whose last update is older than 12 hours
    UpdateAll,
    /// Search TheTVDB for shows
    Search {
        query: String,
        #[arg(long)]
        language: Option<String>,
        /// Use the legacy XML search
        #[arg(long)]
        xml: bool,
    },
    /// Print a stored show as JSON
    Show { tvdb_id: i64 },
    /// Show or set the language used when no translation exists
    FallbackLanguage { language: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    info!(db_path = %config.db_path, "connecting to database");
    let pool = seriesguide_db::connect(&config.db_path)
        .await
        .context("failed to connect to database")?;
    seriesguide_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    settings::insert_defaults(&pool)
        .await
        .context("failed to insert default settings")?;

    if let Command::FallbackLanguage { language } = &cli.command {
        match language {
            Some(language) => {
                settings::set(&pool, settings::SHOWS_LANGUAGE_FALLBACK, language)
                    .await
                    .context("failed to store fallback language")?;
                info!(language = %language, "fallback language set");
            }
            None => {
                let language = config.resolve_fallback_language(&pool).await?;
                println!("{language}");
            }
        }
        return Ok(());
    }

    if let Command::Show { tvdb_id } = cli.command {
        let row = show_repo::get_show(&pool, tvdb_id)
            .await?
            .with_context(|| format!("show {tvdb_id} is not stored"))?;
        let record = ShowRecord::from_row(row)?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let service = build_service(&config, pool.clone()).await?;

    match cli.command {
        Command::Add {
            tvdb_id,
            language,
            trakt_flags,
        } => {
            let flags = match trakt_flags {
                Some(path) => load_trakt_flags(&path)?,
                None => TraktEpisodeFlags::default(),
            };
            let added = service
                .add_show(tvdb_id, language.as_deref(), &flags)
                .await
                .with_context(|| format!("failed to add show {tvdb_id}"))?;
            if added {
                info!(tvdb_id, "show added");
            } else {
                info!(tvdb_id, "show already exists");
            }
        }
        Command::Update { tvdb_id } => {
            retry::with_retry(|| service.update_show(tvdb_id))
                .await
                .with_context(|| format!("failed to update show {tvdb_id}"))?;
            info!(tvdb_id, "show updated");
        }
        Command::UpdateAll => update_all(&service, &pool).await?,
        Command::Search { query, language, xml } => {
            let results = if xml {
                service.search_show(&query, language.as_deref()).await?
            } else {
                let language = match language {
                    Some(language) => language,
                    None => config.resolve_fallback_language(&pool).await?,
                };
                service.search_series(&query, &language).await?
            };
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Show { .. } | Command::FallbackLanguage { .. } => {}
    }

    Ok(())
}

async fn build_service(config: &Config, pool: sqlx::SqlitePool) -> anyhow::Result<ShowService> {
    if config.tvdb_api_key.is_empty() {
        warn!("SG_TVDB_API_KEY is not set, TheTVDB will reject requests");
    }

    let tvdb = TvdbClient::new(config.tvdb_api_key.clone()).with_base_urls(
        config.tvdb_url.as_deref().unwrap_or(tvdb::BASE_URL),
        config.tvdb_xml_url.as_deref().unwrap_or(tvdb::XML_BASE_URL),
    );
    let trakt = TraktClient::new(config.trakt_client_id.clone())
        .with_base_url(config.trakt_url.as_deref().unwrap_or(trakt::BASE_URL));
    let fallback = config.resolve_fallback_language(&pool).await?;

    let mut service = ShowService::new(pool, Arc::new(tvdb), Arc::new(trakt), fallback);
    if let Some(hexagon) = &config.hexagon {
        info!(url = %hexagon.url, "Hexagon enabled");
        service = service.with_cloud(Arc::new(HexagonClient::new(
            hexagon.url.clone(),
            hexagon.token.clone(),
        )));
    }
    Ok(service)
}

fn load_trakt_flags(path: &Path) -> anyhow::Result<TraktEpisodeFlags> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid trakt flags in {}", path.display()))
}

/// Update all due shows. Shows that no longer exist are skipped, other
/// failures are reported after all shows were tried.
async fn update_all(service: &ShowService, pool: &sqlx::SqlitePool) -> anyhow::Result<()> {
    let now = chrono::Utc::now();
    let mut updated = 0usize;
    let mut failed = 0usize;

    for tvdb_id in show_repo::list_show_ids(pool).await? {
        if !service.is_update_due(tvdb_id, now).await? {
            continue;
        }
        match retry::with_retry(|| service.update_show(tvdb_id)).await {
            Ok(()) => updated += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(tvdb_id, error = %e, "show not found, skipping");
            }
            Err(e) => {
                warn!(tvdb_id, code = e.kind().code(), error = %e, "update failed");
                failed += 1;
            }
        }
    }

    info!(updated, failed, "update complete");
    if failed > 0 {
        anyhow::bail!("{failed} show(s) failed to update");
    }
    Ok(())
}
