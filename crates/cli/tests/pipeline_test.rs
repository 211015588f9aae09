//! End-to-end pipeline over a seeded demo corpus, offline.

use chrono::{TimeZone, Utc};
use sentibar_backtest::Backtester;
use sentibar_core::{AliasEntry, AppConfig};
use sentibar_data::{CsvStorage, DemoDataGenerator};
use sentibar_features::{BucketAggregator, Labeler};
use sentibar_model::ProbModel;
use sentibar_scoring::{BatchScorer, EntityNormalizer, TickerAliasSet};
use tempfile::tempdir;

fn demo_aliases() -> Vec<AliasEntry> {
    vec![
        AliasEntry {
            ticker: "ACME".to_string(),
            names: vec!["Acme Corp".to_string(), "Acme".to_string()],
        },
        AliasEntry {
            ticker: "GLOBEX".to_string(),
            names: vec!["Globex".to_string(), "Globex Industries".to_string()],
        },
    ]
}

#[tokio::test]
async fn demo_corpus_flows_from_articles_to_backtest_metrics() {
    let dir = tempdir().unwrap();
    let config = AppConfig::default();
    let aliases = demo_aliases();
    let end = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();

    // Seeded corpus, persisted and re-read so the CSV layer is on the path.
    let mut generator = DemoDataGenerator::new(7);
    let articles = generator.articles(&aliases, 150, 365, end);
    let articles_csv = dir.path().join("articles.csv");
    CsvStorage::write_articles(&articles_csv, &articles).unwrap();
    let articles = CsvStorage::read_articles(&articles_csv).unwrap();
    assert!(!articles.is_empty());

    let alias_set = TickerAliasSet::from_entries(&aliases);
    let normalizer = EntityNormalizer::new(&alias_set).unwrap();
    let scorer = BatchScorer::from_config(&config.sentiment).unwrap();
    let scores = scorer.score_articles(&articles).await.unwrap();
    let mentions = normalizer.explode(&articles, &scores);
    assert!(!mentions.is_empty(), "demo headlines must match aliases");

    let window = config.aggregation.bucket_window().unwrap();
    let aggregator = BucketAggregator::new(window, config.aggregation.decay_half_life);
    let bars = aggregator.aggregate(&mentions);
    assert!(bars.len() > 60, "a year of weekly bars for two tickers");

    let prices = generator.prices(&aliases, 365, end);
    let rows = Labeler::new(window, config.model.horizon_bars).label(&bars, &prices);
    assert!(
        rows.len() >= config.model.min_train_samples,
        "labeled rows ({}) must reach the training minimum",
        rows.len()
    );

    let model_path = dir.path().join("prob_model.json");
    let report = ProbModel::train_rows_and_save(&rows, &model_path, &config.model).unwrap();
    assert_eq!(report.n_samples, rows.len());
    assert!(model_path.exists());

    let model = ProbModel::load(&model_path).unwrap();
    let result = Backtester::from_config(&config.signals)
        .run(&rows, &model)
        .unwrap();

    let metrics = result.metrics;
    assert!(metrics.auc >= 0.0 && metrics.auc <= 1.0);
    assert!(metrics.brier >= 0.0 && metrics.brier <= 1.0);
    assert!(metrics.total_return.is_finite());
    assert!(metrics.max_drawdown >= 0.0);
    assert_eq!(result.curve.len(), rows.len());
}

#[tokio::test]
async fn same_seed_reproduces_identical_bars() {
    let aliases = demo_aliases();
    let end = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
    let config = AppConfig::default();
    let window = config.aggregation.bucket_window().unwrap();

    let mut bars_by_run = Vec::new();
    for _ in 0..2 {
        let mut generator = DemoDataGenerator::new(11);
        let articles = generator.articles(&aliases, 40, 120, end);

        let alias_set = TickerAliasSet::from_entries(&aliases);
        let normalizer = EntityNormalizer::new(&alias_set).unwrap();
        let scorer = BatchScorer::from_config(&config.sentiment).unwrap();
        let scores = scorer.score_articles(&articles).await.unwrap();
        let mentions = normalizer.explode(&articles, &scores);

        let aggregator = BucketAggregator::new(window, config.aggregation.decay_half_life);
        bars_by_run.push(aggregator.aggregate(&mentions));
    }

    assert_eq!(bars_by_run[0], bars_by_run[1]);
}
