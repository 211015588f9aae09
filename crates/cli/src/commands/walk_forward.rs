//! Walk-forward command: rolling retrain-and-test evaluation.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use sentibar_backtest::{render_walk_forward_report, write_report, WalkForward};
use sentibar_core::ConfigLoader;
use sentibar_data::CsvStorage;
use tracing::info;

/// Arguments for the walk-forward command.
#[derive(Args, Debug, Clone)]
pub struct WalkForwardArgs {
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

/// Runs the walk-forward evaluation and writes the fold report.
///
/// # Errors
/// Returns an error when the training set cannot be read or no fold can be
/// formed.
pub async fn run_walk_forward(args: WalkForwardArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    let data_path = args.data.unwrap_or_else(|| config.storage.training_csv.clone());
    let report_path = args
        .output
        .unwrap_or_else(|| config.storage.report_path.clone());

    let rows = CsvStorage::read_training(&data_path)
        .with_context(|| format!("reading training set from {data_path}"))?;

    let walk_forward = WalkForward::from_settings(&config.walk_forward, config.model.cv_folds);
    let report = walk_forward.run(
        &rows,
        config.signals.threshold_long,
        config.signals.costs_bps,
    )?;

    let rendered = render_walk_forward_report(&report);
    write_report(Path::new(&report_path), &rendered)?;

    info!(
        "Walk-forward over {} rows: {} folds, overall AUC {:.4}, total return {:.2}%",
        rows.len(),
        report.summary.n_folds,
        report.summary.overall_auc,
        report.summary.total_return * 100.0
    );
    info!("Report -> {}", report_path);

    Ok(())
}
