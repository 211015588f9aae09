//! Price observation repository keyed by (ticker, timestamp).

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::PriceObservation;

#[derive(Debug, Clone)]
pub struct PriceRepository {
    pool: PgPool,
}

impl PriceRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upserts price observations; a refreshed quote for a known timestamp
    /// replaces the stored close.
    ///
    /// # Errors
    /// Returns an error if the database transaction fails.
    pub async fn upsert_batch(&self, prices: &[PriceObservation]) -> Result<()> {
        if prices.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for chunk in prices.chunks(100) {
            for price in chunk {
                sqlx::query(
                    r"
                    INSERT INTO price_data (ticker, timestamp, close)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (ticker, timestamp) DO UPDATE
                    SET close = EXCLUDED.close
                    ",
                )
                .bind(&price.ticker)
                .bind(price.timestamp)
                .bind(price.close)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// All observations for a ticker, oldest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn load_for_ticker(&self, ticker: &str) -> Result<Vec<PriceObservation>> {
        let rows: Vec<(String, DateTime<Utc>, f64)> = sqlx::query_as(
            r"
            SELECT ticker, timestamp, close
            FROM price_data
            WHERE ticker = $1
            ORDER BY timestamp ASC
            ",
        )
        .bind(ticker)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(ticker, timestamp, close)| PriceObservation {
                ticker,
                timestamp,
                close,
            })
            .collect())
    }

    /// All stored observations, ordered by (ticker, timestamp).
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn load_all(&self) -> Result<Vec<PriceObservation>> {
        let rows: Vec<(String, DateTime<Utc>, f64)> = sqlx::query_as(
            r"
            SELECT ticker, timestamp, close
            FROM price_data
            ORDER BY ticker ASC, timestamp ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(ticker, timestamp, close)| PriceObservation {
                ticker,
                timestamp,
                close,
            })
            .collect())
    }
}
