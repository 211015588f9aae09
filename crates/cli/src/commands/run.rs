//! Full-pipeline command: stored articles through a backtest report.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use sentibar_backtest::{render_backtest_report, write_report, Backtester};
use sentibar_core::{ConfigLoader, PipelineError};
use sentibar_data::{build_price_source, ArticleSource, CsvArticleSource, CsvStorage, PriceSource};
use sentibar_features::{BucketAggregator, Labeler};
use sentibar_model::ProbModel;
use sentibar_scoring::{BatchScorer, EntityNormalizer, TickerAliasSet};
use tracing::{info, warn};

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    #[arg(
        short,
        long,
        default_value = "config/Config.toml",
        env = "SENTIBAR_CONFIG"
    )]
    pub config: String,
}

/// Runs the full pipeline: ingest, score, aggregate, label, train, backtest.
///
/// Each stage checks its output before the next one starts, so an empty
/// intermediate halts the run with the failing stage named and the artifacts
/// of prior runs intact.
///
/// # Errors
/// Returns an error when any stage fails or produces no output.
pub async fn run_pipeline(args: RunArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    let window = config.aggregation.bucket_window()?;

    info!("Stage 1/6: ingesting articles");
    let source =
        CsvArticleSource::new(&config.ingest.articles_csv).with_min_chars(config.ingest.min_chars);
    let articles = source.fetch().await?;
    if articles.is_empty() {
        return Err(PipelineError::InsufficientData(
            "ingest produced no articles".to_string(),
        )
        .into());
    }
    info!("Ingested {} articles", articles.len());

    info!("Stage 2/6: scoring and mapping entities");
    let aliases = TickerAliasSet::from_entries(&config.ingest.aliases);
    let normalizer = EntityNormalizer::new(&aliases)?;
    let scorer = BatchScorer::from_config(&config.sentiment)?;
    let scores = scorer.score_articles(&articles).await?;
    let mentions = normalizer.explode(&articles, &scores);
    if mentions.is_empty() {
        return Err(PipelineError::InsufficientData(
            "no scored article matched a configured ticker".to_string(),
        )
        .into());
    }
    info!("Mapped {} article-ticker mentions", mentions.len());

    info!("Stage 3/6: aggregating sentiment bars");
    let aggregator = BucketAggregator::new(window, config.aggregation.decay_half_life);
    let bars = aggregator.aggregate(&mentions);
    if bars.is_empty() {
        return Err(PipelineError::InsufficientData(
            "aggregation produced no sentiment bars".to_string(),
        )
        .into());
    }
    CsvStorage::write_bars(&config.storage.bars_csv, &bars)
        .with_context(|| format!("writing bars to {}", config.storage.bars_csv))?;
    info!(
        "Aggregated {} bars -> {}",
        bars.len(),
        config.storage.bars_csv
    );

    info!("Stage 4/6: labeling with prices");
    let price_source = build_price_source(&config.prices)?;
    let mut prices = Vec::new();
    for ticker in aliases.tickers() {
        let rows = price_source
            .fetch(ticker, &config.prices.interval, &config.prices.period)
            .await?;
        if rows.is_empty() {
            warn!("No prices for {}", ticker);
        }
        prices.extend(rows);
    }
    if prices.is_empty() {
        return Err(PipelineError::InsufficientData(
            "no price data for any configured ticker".to_string(),
        )
        .into());
    }
    let labeler = Labeler::new(window, config.model.horizon_bars);
    let rows = labeler.label(&bars, &prices);
    if rows.is_empty() {
        return Err(PipelineError::InsufficientData(
            "labeling produced no training rows".to_string(),
        )
        .into());
    }
    CsvStorage::write_training(&config.storage.training_csv, &rows)
        .with_context(|| format!("writing training set to {}", config.storage.training_csv))?;
    info!(
        "Training set has {} rows -> {}",
        rows.len(),
        config.storage.training_csv
    );

    info!("Stage 5/6: training probability model");
    let model_path = Path::new(&config.model.path);
    let report = ProbModel::train_rows_and_save(&rows, model_path, &config.model)?;
    info!(
        "Model trained on {} rows ({} positive) -> {}",
        report.n_samples,
        report.n_positive,
        report.model_path.display()
    );

    info!("Stage 6/6: running backtest");
    let model = ProbModel::load(model_path)?;
    let result = Backtester::from_config(&config.signals).run(&rows, &model)?;
    let rendered = render_backtest_report(&result.metrics);
    write_report(Path::new(&config.storage.report_path), &rendered)?;

    let metrics = &result.metrics;
    info!("Pipeline complete");
    info!("  Brier:        {:.4}", metrics.brier);
    info!("  AUC-ROC:      {:.4}", metrics.auc);
    info!("  Sharpe:       {:.2}", metrics.sharpe);
    info!("  Total return: {:.2}%", metrics.total_return * 100.0);
    info!("  Max drawdown: {:.2}%", metrics.max_drawdown * 100.0);
    info!("Report -> {}", config.storage.report_path);

    Ok(())
}
