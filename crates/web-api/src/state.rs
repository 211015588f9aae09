//! Shared state injected into every handler at router construction.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use sentibar_alerts::{build_notifiers, AlertEngine, Notifier};
use sentibar_core::{AppConfig, PipelineError, Result, SignalConfig};
use sentibar_data::{CsvStorage, SentimentBar};
use sentibar_model::{latest_probabilities, ProbModel};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Everything the handlers touch: config, artifact paths, the alert engine,
/// and the notifier sinks. Cheap to clone; handlers share one inner value.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: AppConfig,
    bars_csv: PathBuf,
    model_path: PathBuf,
    engine: Mutex<AlertEngine>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl AppState {
    /// Builds the state from a validated configuration, loading any
    /// persisted alert rules.
    ///
    /// # Errors
    /// Returns an error when the rules file is corrupt or the webhook
    /// client cannot be constructed.
    pub fn new(config: AppConfig) -> Result<Self> {
        let engine = AlertEngine::with_store(config.signals.clone(), &config.alerts.rules_path)?;
        let notifiers = build_notifiers(&config.alerts)?;
        let bars_csv = PathBuf::from(&config.storage.bars_csv);
        let model_path = PathBuf::from(&config.model.path);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                bars_csv,
                model_path,
                engine: Mutex::new(engine),
                notifiers,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn signals(&self) -> &SignalConfig {
        &self.inner.config.signals
    }

    pub async fn engine(&self) -> MutexGuard<'_, AlertEngine> {
        self.inner.engine.lock().await
    }

    #[must_use]
    pub fn notifiers(&self) -> &[Box<dyn Notifier>] {
        &self.inner.notifiers
    }

    /// Reads the full bar table.
    ///
    /// # Errors
    /// Returns [`PipelineError::InsufficientData`] when no bars have been
    /// aggregated yet, or a storage error when the file is unreadable.
    pub fn load_bars(&self) -> Result<Vec<SentimentBar>> {
        if !self.inner.bars_csv.exists() {
            return Err(PipelineError::InsufficientData(format!(
                "no sentiment bars at {}",
                self.inner.bars_csv.display()
            )));
        }
        CsvStorage::read_bars(&self.inner.bars_csv)
            .map_err(|e| PipelineError::Storage(e.to_string()))
    }

    /// Loads the current model artifact. Loaded per request: the trainer
    /// replaces the artifact with an atomic rename, so this always sees a
    /// complete file and picks up retrains without a restart.
    ///
    /// # Errors
    /// Returns [`PipelineError::ModelArtifact`] when missing or corrupt.
    pub fn load_model(&self) -> Result<ProbModel> {
        ProbModel::load(&self.inner.model_path)
    }

    /// Per-ticker probabilities for the newest bucket, or an empty map when
    /// no model artifact exists yet (probability conditions then evaluate
    /// as false).
    #[must_use]
    pub fn probabilities(&self, bars: &[SentimentBar]) -> HashMap<String, f64> {
        match self.load_model() {
            Ok(model) => latest_probabilities(&model, bars),
            Err(err) => {
                debug!("No model for probability map: {err}");
                HashMap::new()
            }
        }
    }
}
