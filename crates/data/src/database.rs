//! Postgres connection handling and schema bootstrap for service mode.

use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Shared database handle. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connects to Postgres with a bounded connection pool.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Creates the tables used by scheduled ingestion and serving if they
    /// do not exist yet.
    ///
    /// # Errors
    /// Returns an error if any DDL statement fails.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY,
                ticker TEXT,
                source TEXT NOT NULL,
                published_at TIMESTAMPTZ NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                url TEXT,
                lang TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sentiment_bars (
                ticker TEXT NOT NULL,
                bucket_start TIMESTAMPTZ NOT NULL,
                mean_sent DOUBLE PRECISION NOT NULL,
                std_sent DOUBLE PRECISION NOT NULL,
                min_sent DOUBLE PRECISION NOT NULL,
                max_sent DOUBLE PRECISION NOT NULL,
                count BIGINT NOT NULL,
                unc_mean DOUBLE PRECISION NOT NULL,
                time_decay_mean DOUBLE PRECISION NOT NULL,
                PRIMARY KEY (ticker, bucket_start)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS price_data (
                ticker TEXT NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                close DOUBLE PRECISION NOT NULL,
                PRIMARY KEY (ticker, timestamp)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS alert_history (
                id BIGSERIAL PRIMARY KEY,
                rule_id TEXT NOT NULL,
                ticker TEXT NOT NULL,
                probability DOUBLE PRECISION,
                decision TEXT NOT NULL,
                triggered_at TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Access to the underlying pool for repositories.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
