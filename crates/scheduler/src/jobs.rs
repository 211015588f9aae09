//! Bodies of the recurring service jobs.
//!
//! Every job is idempotent against persisted state: articles upsert by id,
//! bars by (ticker, bucket_start), prices by (ticker, timestamp). A failed
//! run leaves whatever the previous run stored intact.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use sentibar_alerts::{build_notifiers, notify_all, AlertEngine};
use sentibar_core::AppConfig;
use sentibar_data::{
    build_price_source, AlertHistoryRepository, ArticleRepository, ArticleSource, BarRepository,
    CsvArticleSource, Database, PriceRepository, PriceSource,
};
use sentibar_features::BucketAggregator;
use sentibar_model::{latest_probabilities, ProbModel};
use sentibar_scoring::{BatchScorer, EntityNormalizer, TickerAliasSet};
use tracing::{error, info, warn};

/// Pulls articles from the configured drop and upserts them by id.
///
/// # Errors
/// Returns an error when the source cannot be read or the upsert fails.
pub async fn ingest_articles(config: &AppConfig, db: &Database) -> Result<u64> {
    let source =
        CsvArticleSource::new(&config.ingest.articles_csv).with_min_chars(config.ingest.min_chars);
    let articles = source.fetch().await?;
    if articles.is_empty() {
        info!("Ingest found no articles at {}", config.ingest.articles_csv);
        return Ok(0);
    }

    let inserted = ArticleRepository::new(db.pool().clone())
        .upsert_batch(&articles)
        .await?;
    info!("Ingested {} articles ({} new)", articles.len(), inserted);
    Ok(inserted)
}

/// Rebuilds sentiment bars from every stored article and upserts them by
/// (ticker, bucket_start).
///
/// # Errors
/// Returns an error when scoring fails or the database cannot be reached.
pub async fn aggregate_bars(config: &AppConfig, db: &Database) -> Result<usize> {
    let articles = ArticleRepository::new(db.pool().clone()).load_all().await?;
    if articles.is_empty() {
        info!("Aggregation skipped: no stored articles");
        return Ok(0);
    }

    let aliases = TickerAliasSet::from_entries(&config.ingest.aliases);
    let normalizer = EntityNormalizer::new(&aliases)?;
    let scorer = BatchScorer::from_config(&config.sentiment)?;
    let scores = scorer.score_articles(&articles).await?;
    let mentions = normalizer.explode(&articles, &scores);
    if mentions.is_empty() {
        warn!(
            "Aggregation matched no tickers across {} articles",
            articles.len()
        );
        return Ok(0);
    }

    let aggregator = BucketAggregator::new(
        config.aggregation.bucket_window()?,
        config.aggregation.decay_half_life,
    );
    let bars = aggregator.aggregate(&mentions);
    BarRepository::new(db.pool().clone())
        .upsert_batch(&bars)
        .await?;
    info!(
        "Aggregated {} mentions into {} bars",
        mentions.len(),
        bars.len()
    );
    Ok(bars.len())
}

/// Fetches close prices for every configured ticker and upserts them.
///
/// A ticker whose sources are all exhausted is logged and skipped; the rest
/// of the batch still runs.
///
/// # Errors
/// Returns an error when the source stack cannot be built or an upsert
/// fails.
pub async fn refresh_prices(config: &AppConfig, db: &Database) -> Result<usize> {
    if config.ingest.aliases.is_empty() {
        info!("Price refresh skipped: no tickers configured");
        return Ok(0);
    }

    let source = build_price_source(&config.prices)?;
    let repo = PriceRepository::new(db.pool().clone());
    let mut stored = 0usize;
    for entry in &config.ingest.aliases {
        match source
            .fetch(&entry.ticker, &config.prices.interval, &config.prices.period)
            .await
        {
            Ok(prices) if prices.is_empty() => {
                warn!("No prices available for {}", entry.ticker);
            }
            Ok(prices) => {
                repo.upsert_batch(&prices).await?;
                stored += prices.len();
            }
            Err(e) => {
                error!("Price fetch failed for {}: {}", entry.ticker, e);
            }
        }
    }
    info!(
        "Stored {} price rows across {} tickers",
        stored,
        config.ingest.aliases.len()
    );
    Ok(stored)
}

/// Evaluates every alert rule against the latest stored bars and records
/// fired events in the alert history.
///
/// Runs with an empty probability map when no model artifact exists yet, so
/// rules on bar fields still fire before the first training.
///
/// # Errors
/// Returns an error when bars cannot be loaded or the rule store is corrupt.
pub async fn sweep_alerts(config: &AppConfig, db: &Database) -> Result<usize> {
    let bars = BarRepository::new(db.pool().clone())
        .load(None, None, None)
        .await?;
    if bars.is_empty() {
        info!("Alert sweep skipped: no sentiment bars stored");
        return Ok(0);
    }

    let probabilities = match ProbModel::load(Path::new(&config.model.path)) {
        Ok(model) => latest_probabilities(&model, &bars),
        Err(e) => {
            info!("Alert sweep running without a model: {}", e);
            HashMap::new()
        }
    };

    let mut engine = AlertEngine::with_store(config.signals.clone(), &config.alerts.rules_path)?;
    let events = engine.process(&bars, &probabilities, Utc::now());
    if events.is_empty() {
        return Ok(0);
    }

    let notifiers = build_notifiers(&config.alerts)?;
    let delivered = notify_all(&notifiers, &events).await;

    let history = AlertHistoryRepository::new(db.pool().clone());
    for event in &events {
        if let Err(e) = history.insert(&event.to_history_record()).await {
            error!("Failed to record alert {} in history: {}", event.rule_id, e);
        }
    }
    info!(
        "Alert sweep fired {} events ({} deliveries)",
        events.len(),
        delivered
    );
    Ok(events.len())
}
