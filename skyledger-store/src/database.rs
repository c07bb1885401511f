use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: SqlitePool,
}

impl DbClient {
    /// Connect to a file-backed database, creating it if missing. WAL lets readers run
    /// alongside the single writer; the busy timeout is how long a writer waits for the
    /// write lock before giving up.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        if is_memory_url(&config.url) {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.busy_timeout_seconds.max(3)))
            .connect_with(options)
            .await?;

        info!("Connected to {}", config.url);
        Ok(Self { pool })
    }

    /// Private in-memory database. Every pooled connection would otherwise see its own
    /// empty database, so the pool holds exactly one connection and never recycles it.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

pub fn is_memory_url(url: &str) -> bool {
    url == "sqlite::memory:" || url == ":memory:" || url.contains("mode=memory")
}
