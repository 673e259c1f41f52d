use anyhow::{Context, Result};
use price_alert_core::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::repositories::PriceRepository;

/// `SQLite` database holding the price history.
///
/// Runs the bundled migrations on connect. The pool is shared between the
/// monitor (sole writer) and the HTTP surface (readers); WAL journaling lets
/// readers proceed while a cycle is writing.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects to the database described by `config`, creating the file
    /// and its parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created, the connection
    /// fails, or migrations fail.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if let Some(file_path) = config.url.strip_prefix("sqlite://") {
            if let Some(parent) = Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("Invalid database url: {}", config.url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", config.url))?;

        Self::migrate(pool).await
    }

    /// Creates an in-memory database.
    ///
    /// Uses a single connection that is never recycled, since every `SQLite`
    /// memory connection is its own database.
    ///
    /// # Errors
    ///
    /// Returns error if connection fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(Self { pool })
    }

    #[must_use]
    pub fn prices(&self) -> PriceRepository {
        PriceRepository::new(self.pool.clone())
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
