//! Persistent log of fired alerts.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// One fired alert as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertHistoryRecord {
    pub rule_id: String,
    pub ticker: String,
    pub probability: Option<f64>,
    pub decision: String,
    pub triggered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AlertHistoryRepository {
    pool: PgPool,
}

impl AlertHistoryRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one fired alert.
    ///
    /// # Errors
    /// Returns an error if the database insert fails.
    pub async fn insert(&self, record: &AlertHistoryRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO alert_history
                (rule_id, ticker, probability, decision, triggered_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&record.rule_id)
        .bind(&record.ticker)
        .bind(record.probability)
        .bind(&record.decision)
        .bind(record.triggered_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recently fired alerts, newest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn get_recent(&self, limit: i64) -> Result<Vec<AlertHistoryRecord>> {
        let rows: Vec<(String, String, Option<f64>, String, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT rule_id, ticker, probability, decision, triggered_at
            FROM alert_history
            ORDER BY triggered_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(rule_id, ticker, probability, decision, triggered_at)| AlertHistoryRecord {
                    rule_id,
                    ticker,
                    probability,
                    decision,
                    triggered_at,
                },
            )
            .collect())
    }
}
