//! Demo-data command: deterministic offline articles and prices.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use sentibar_core::ConfigLoader;
use sentibar_data::{CsvStorage, DemoDataGenerator};
use tracing::info;

/// Arguments for the demo-data command.
#[derive(Args, Debug, Clone)]
pub struct DemoDataArgs {
    /// Config file path
    #[arg(
        short,
        long,
        default_value = "config/Config.toml",
        env = "SENTIBAR_CONFIG"
    )]
    pub config: String,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Headlines generated per configured entity
    #[arg(long, default_value_t = 120)]
    pub per_entity: usize,

    /// Days of history to generate
    #[arg(long, default_value_t = 365)]
    pub days: i64,
}

/// Writes a seeded demo corpus to the configured article and demo price
/// paths, so a full offline `run` works out of the box.
///
/// # Errors
/// Returns an error when no entities are configured or a CSV cannot be
/// written.
pub async fn run_demo_data(args: DemoDataArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    if config.ingest.aliases.is_empty() {
        bail!("no entities configured; add [[ingest.aliases]] entries first");
    }

    let end = Utc::now();
    let mut generator = DemoDataGenerator::new(args.seed);

    let articles = generator.articles(&config.ingest.aliases, args.per_entity, args.days, end);
    CsvStorage::write_articles(&config.ingest.articles_csv, &articles)
        .with_context(|| format!("writing articles to {}", config.ingest.articles_csv))?;

    let prices = generator.prices(&config.ingest.aliases, args.days, end);
    CsvStorage::write_prices(&config.prices.demo_csv, &prices)
        .with_context(|| format!("writing prices to {}", config.prices.demo_csv))?;

    info!(
        "Generated {} articles -> {}",
        articles.len(),
        config.ingest.articles_csv
    );
    info!(
        "Generated {} price rows -> {}",
        prices.len(),
        config.prices.demo_csv
    );

    Ok(())
}
