//! Train command: fit the probability model and save the artifact.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use sentibar_core::ConfigLoader;
use sentibar_model::ProbModel;
use tracing::info;

/// Arguments for the train command.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
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
}

/// Trains from the labeled training set and saves the model artifact.
///
/// # Errors
/// Returns an error when the training set is missing, too small, or the
/// artifact cannot be written.
pub async fn run_train(args: TrainArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;
    let data_path = args
        .data
        .unwrap_or_else(|| config.storage.training_csv.clone());

    let report = ProbModel::train_and_save(
        Path::new(&data_path),
        Path::new(&config.model.path),
        &config.model,
    )?;

    info!(
        "Trained on {} rows ({} positive), {} calibrated members -> {}",
        report.n_samples,
        report.n_positive,
        report.members,
        report.model_path.display()
    );

    Ok(())
}
