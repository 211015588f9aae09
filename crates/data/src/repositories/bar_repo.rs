//! Sentiment bar repository keyed by (ticker, bucket_start).

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::SentimentBar;

type BarRow = (String, DateTime<Utc>, f64, f64, f64, f64, i64, f64, f64);

fn from_row(row: BarRow) -> SentimentBar {
    SentimentBar {
        ticker: row.0,
        bucket_start: row.1,
        mean_sent: row.2,
        std_sent: row.3,
        min_sent: row.4,
        max_sent: row.5,
        count: row.6.max(0) as u64,
        unc_mean: row.7,
        time_decay_mean: row.8,
    }
}

#[derive(Debug, Clone)]
pub struct BarRepository {
    pool: PgPool,
}

impl BarRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upserts a batch of bars. Aggregation recomputes bars from scratch
    /// each run, so conflicting keys take the freshly computed values.
    ///
    /// # Errors
    /// Returns an error if the database transaction fails.
    pub async fn upsert_batch(&self, bars: &[SentimentBar]) -> Result<()> {
        if bars.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for chunk in bars.chunks(100) {
            for bar in chunk {
                sqlx::query(
                    r"
                    INSERT INTO sentiment_bars
                        (ticker, bucket_start, mean_sent, std_sent, min_sent,
                         max_sent, count, unc_mean, time_decay_mean)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (ticker, bucket_start) DO UPDATE
                    SET mean_sent = EXCLUDED.mean_sent,
                        std_sent = EXCLUDED.std_sent,
                        min_sent = EXCLUDED.min_sent,
                        max_sent = EXCLUDED.max_sent,
                        count = EXCLUDED.count,
                        unc_mean = EXCLUDED.unc_mean,
                        time_decay_mean = EXCLUDED.time_decay_mean
                    ",
                )
                .bind(&bar.ticker)
                .bind(bar.bucket_start)
                .bind(bar.mean_sent)
                .bind(bar.std_sent)
                .bind(bar.min_sent)
                .bind(bar.max_sent)
                .bind(bar.count as i64)
                .bind(bar.unc_mean)
                .bind(bar.time_decay_mean)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Loads bars, optionally filtered by ticker and bucket range, ordered
    /// by (ticker, bucket_start).
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn load(
        &self,
        ticker: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SentimentBar>> {
        let rows: Vec<BarRow> = sqlx::query_as(
            r"
            SELECT ticker, bucket_start, mean_sent, std_sent, min_sent,
                   max_sent, count, unc_mean, time_decay_mean
            FROM sentiment_bars
            WHERE ($1::text IS NULL OR ticker = $1)
              AND ($2::timestamptz IS NULL OR bucket_start >= $2)
              AND ($3::timestamptz IS NULL OR bucket_start <= $3)
            ORDER BY ticker ASC, bucket_start ASC
            ",
        )
        .bind(ticker)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(from_row).collect())
    }

    /// Most recent bars for a ticker, newest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn latest_for_ticker(&self, ticker: &str, limit: i64) -> Result<Vec<SentimentBar>> {
        let rows: Vec<BarRow> = sqlx::query_as(
            r"
            SELECT ticker, bucket_start, mean_sent, std_sent, min_sent,
                   max_sent, count, unc_mean, time_decay_mean
            FROM sentiment_bars
            WHERE ticker = $1
            ORDER BY bucket_start DESC
            LIMIT $2
            ",
        )
        .bind(ticker)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(from_row).collect())
    }

    /// Distinct tickers with their bar counts.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn ticker_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT ticker, COUNT(*) AS bars
            FROM sentiment_bars
            GROUP BY ticker
            ORDER BY ticker ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
