//! Article repository: dedup-by-id upserts and time-range queries.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::Article;

#[derive(Debug, Clone)]
pub struct ArticleRepository {
    pool: PgPool,
}

impl ArticleRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a batch of articles, skipping ids already stored. Re-running
    /// ingestion over an overlapping feed is a no-op for known articles.
    ///
    /// # Errors
    /// Returns an error if the database transaction fails.
    pub async fn upsert_batch(&self, articles: &[Article]) -> Result<u64> {
        if articles.is_empty() {
            return Ok(0);
        }

        let mut inserted = 0;
        let mut tx = self.pool.begin().await?;

        for chunk in articles.chunks(100) {
            for article in chunk {
                let result = sqlx::query(
                    r"
                    INSERT INTO articles
                        (id, ticker, source, published_at, title, body, url, lang)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (id) DO NOTHING
                    ",
                )
                .bind(&article.id)
                .bind(&article.ticker)
                .bind(&article.source)
                .bind(article.published_at)
                .bind(&article.title)
                .bind(&article.body)
                .bind(&article.url)
                .bind(&article.lang)
                .execute(&mut *tx)
                .await?;
                inserted += result.rows_affected();
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Articles published within a time range, oldest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(
            r"
            SELECT id, ticker, source, published_at, title, body, url, lang
            FROM articles
            WHERE published_at >= $1 AND published_at <= $2
            ORDER BY published_at ASC
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(articles)
    }

    /// All stored articles, oldest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn load_all(&self) -> Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(
            r"
            SELECT id, ticker, source, published_at, title, body, url, lang
            FROM articles
            ORDER BY published_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(articles)
    }

    /// Most recently published articles.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn get_recent(&self, limit: i64) -> Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(
            r"
            SELECT id, ticker, source, published_at, title, body, url, lang
            FROM articles
            ORDER BY published_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(articles)
    }
}
