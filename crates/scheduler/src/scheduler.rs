//! Cron wiring for the recurring service jobs.

use std::sync::Arc;

use anyhow::Result;
use sentibar_core::AppConfig;
use sentibar_data::Database;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::jobs;

/// Runs the recurring pipeline jobs on their configured cron schedules.
pub struct PipelineScheduler {
    config: AppConfig,
    db: Arc<Database>,
}

impl PipelineScheduler {
    #[must_use]
    pub fn new(config: AppConfig, db: Arc<Database>) -> Self {
        Self { config, db }
    }

    /// Registers every job and runs until the process is stopped.
    ///
    /// # Errors
    /// Returns an error if a cron expression cannot be parsed or the
    /// scheduler fails to start.
    pub async fn start(self) -> Result<()> {
        let crons = self.config.scheduler.clone();
        info!(
            "Starting scheduler: ingest '{}', aggregate '{}', prices '{}', alerts '{}'",
            crons.ingest_cron, crons.aggregate_cron, crons.prices_cron, crons.alerts_cron
        );

        let scheduler = JobScheduler::new().await?;

        let config = self.config.clone();
        let db = self.db.clone();
        let ingest = Job::new_async(crons.ingest_cron.as_str(), move |_uuid, _lock| {
            let config = config.clone();
            let db = db.clone();
            Box::pin(async move {
                if let Err(e) = jobs::ingest_articles(&config, &db).await {
                    error!("Ingest job failed: {}", e);
                }
            })
        })?;
        scheduler.add(ingest).await?;

        let config = self.config.clone();
        let db = self.db.clone();
        let aggregate = Job::new_async(crons.aggregate_cron.as_str(), move |_uuid, _lock| {
            let config = config.clone();
            let db = db.clone();
            Box::pin(async move {
                if let Err(e) = jobs::aggregate_bars(&config, &db).await {
                    error!("Aggregation job failed: {}", e);
                }
            })
        })?;
        scheduler.add(aggregate).await?;

        let config = self.config.clone();
        let db = self.db.clone();
        let prices = Job::new_async(crons.prices_cron.as_str(), move |_uuid, _lock| {
            let config = config.clone();
            let db = db.clone();
            Box::pin(async move {
                if let Err(e) = jobs::refresh_prices(&config, &db).await {
                    error!("Price refresh job failed: {}", e);
                }
            })
        })?;
        scheduler.add(prices).await?;

        let config = self.config.clone();
        let db = self.db.clone();
        let alerts = Job::new_async(crons.alerts_cron.as_str(), move |_uuid, _lock| {
            let config = config.clone();
            let db = db.clone();
            Box::pin(async move {
                if let Err(e) = jobs::sweep_alerts(&config, &db).await {
                    error!("Alert sweep job failed: {}", e);
                }
            })
        })?;
        scheduler.add(alerts).await?;

        scheduler.start().await?;
        info!("Scheduler started");

        // Keep the scheduler running
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
        }
    }

    /// Runs every job once in pipeline order (manual execution).
    ///
    /// # Errors
    /// Returns the first job error encountered.
    pub async fn run_once(&self) -> Result<()> {
        jobs::ingest_articles(&self.config, &self.db).await?;
        jobs::aggregate_bars(&self.config, &self.db).await?;
        jobs::refresh_prices(&self.config, &self.db).await?;
        jobs::sweep_alerts(&self.config, &self.db).await?;
        Ok(())
    }
}
