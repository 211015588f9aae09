//! Backtest command: evaluate the saved model over a labeled training set.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use sentibar_backtest::{render_backtest_report, write_report, Backtester};
use sentibar_core::ConfigLoader;
use sentibar_data::CsvStorage;
use sentibar_model::ProbModel;
use tracing::info;

/// Arguments for the backtest command.
#[derive(Args, Debug, Clone)]
pub struct BacktestArgs {
    /// Config file path
    #[arg(
        short,
        long,
        default_value = "config/Config.toml",
        env = "SENTIBAR_CONFIG"
    )]
    pub config: String,

    /// Labeled training CSV (defaults to the configured storage path)
    #[arg(short, long)]
    pub data: Option<String>,

    /// Report output path (defaults to the configured report path)
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Runs a single-split backtest and writes the markdown report.
///
/// # Errors
/// Returns an error when the training set or model artifact cannot be read
/// or the evaluation fails.
pub async fn run_backtest(args: BacktestArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    let data_path = args.data.unwrap_or_else(|| config.storage.training_csv.clone());
    let report_path = args
        .output
        .unwrap_or_else(|| config.storage.report_path.clone());

    let rows = CsvStorage::read_training(&data_path)
        .with_context(|| format!("reading training set from {data_path}"))?;
    let model = ProbModel::load(Path::new(&config.model.path))?;

    let result = Backtester::from_config(&config.signals).run(&rows, &model)?;
    let rendered = render_backtest_report(&result.metrics);
    write_report(Path::new(&report_path), &rendered)?;

    let metrics = &result.metrics;
    info!(
        "Backtest over {} rows: Sharpe {:.2}, AUC {:.4}, total return {:.2}%",
        rows.len(),
        metrics.sharpe,
        metrics.auc,
        metrics.total_return * 100.0
    );
    info!("Report -> {}", report_path);

    Ok(())
}
