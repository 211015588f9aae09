//! Schedule command: run the recurring jobs as a daemon.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use sentibar_core::ConfigLoader;
use sentibar_data::Database;
use sentibar_scheduler::PipelineScheduler;
use tracing::info;

/// Arguments for the schedule command.
#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    /// Config file path
    #[arg(
        short,
        long,
        default_value = "config/Config.toml",
        env = "SENTIBAR_CONFIG"
    )]
    pub config: String,

    /// Run every job once and exit instead of staying resident
    #[arg(long)]
    pub once: bool,
}

/// Connects to the database, ensures the schema, and runs the scheduler.
///
/// # Errors
/// Returns an error when the database is unreachable or a cron expression
/// cannot be parsed.
pub async fn run_schedule(args: ScheduleArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)?;

    let db = Database::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("connecting to {}", config.database.url))?;
    db.init_schema().await?;
    info!("Database schema ready");

    let scheduler = PipelineScheduler::new(config, Arc::new(db));
    if args.once {
        scheduler.run_once().await
    } else {
        scheduler.start().await
    }
}
