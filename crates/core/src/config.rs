use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::window::BucketWindow;

/// Application configuration.
///
/// The `aggregation`, `model`, and `signals` sections drive trading
/// decisions and must be supplied explicitly; deserialization fails when
/// they are missing. Every other section falls back to its defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub aggregation: AggregationConfig,
    pub model: ModelConfig,
    pub signals: SignalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub prices: PriceConfig,
    #[serde(default)]
    pub walk_forward: WalkForwardSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Bucket window string: "1h", "1d", "W-MON", "1M", ...
    pub window: String,
    /// Half-life of the intra-bucket decay weighting, in observations.
    pub decay_half_life: f64,
}

impl AggregationConfig {
    /// Parses the configured window string.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidConfig` when the string is not a
    /// recognized window form.
    pub fn bucket_window(&self) -> Result<BucketWindow, PipelineError> {
        BucketWindow::from_str(&self.window)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Forward-return horizon in buckets.
    pub horizon_bars: u32,
    #[serde(default = "default_model_path")]
    pub path: String,
    #[serde(default = "default_min_train_samples")]
    pub min_train_samples: usize,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Probability above which the strategy goes long.
    pub threshold_long: f64,
    /// Probability below which the serving decision is "short".
    pub threshold_short: f64,
    /// Round-trip transaction cost in basis points.
    pub costs_bps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub articles_csv: String,
    /// Articles with fewer combined title+body characters are skipped.
    pub min_chars: usize,
    pub aliases: Vec<AliasEntry>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            articles_csv: "data/articles.csv".to_string(),
            min_chars: 0,
            aliases: Vec::new(),
        }
    }
}

/// One ticker with its case-insensitive alias strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasEntry {
    pub ticker: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// "lexicon" (offline) or "remote" (HTTP scoring endpoint).
    pub backend: String,
    pub endpoint: Option<String>,
    pub batch_size: usize,
    /// Scoring texts are truncated to this many characters.
    pub max_chars: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            backend: "lexicon".to_string(),
            endpoint: None,
            batch_size: 16,
            max_chars: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Live quote endpoint; when unset only the demo tier is consulted.
    pub endpoint: Option<String>,
    pub interval: String,
    pub period: String,
    pub demo_csv: String,
    /// Per-request timeout for the live tier, in seconds.
    pub timeout_secs: u64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            interval: "1d".to_string(),
            period: "1y".to_string(),
            demo_csv: "data/demo_prices.csv".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardSettings {
    pub train_frac: f64,
    pub step_frac: f64,
    pub expanding: bool,
    /// Rolling-window size as a fraction of total rows; only read when
    /// `expanding` is false.
    pub window_frac: Option<f64>,
    pub min_train_samples: usize,
}

impl Default for WalkForwardSettings {
    fn default() -> Self {
        Self {
            train_frac: 0.6,
            step_frac: 0.1,
            expanding: true,
            window_frac: None,
            min_train_samples: 30,
        }
    }
}

/// Flat-file locations for pipeline artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bars_csv: String,
    pub training_csv: String,
    pub report_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bars_csv: "data/sentiment_bars.csv".to_string(),
            training_csv: "data/training_set.csv".to_string(),
            report_path: "outputs/report.md".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/sentibar".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub rules_path: String,
    pub webhook_url: Option<String>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            rules_path: "data/alert_rules.json".to_string(),
            webhook_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Six-field cron expressions (seconds first).
    pub ingest_cron: String,
    pub aggregate_cron: String,
    pub prices_cron: String,
    pub alerts_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ingest_cron: "0 0 */2 * * *".to_string(),
            aggregate_cron: "0 15 */4 * * *".to_string(),
            prices_cron: "0 0 * * * *".to_string(),
            alerts_cron: "0 */30 * * * *".to_string(),
        }
    }
}

fn default_model_path() -> String {
    "data/prob_model.json".to_string()
}

const fn default_min_train_samples() -> usize {
    30
}

const fn default_cv_folds() -> usize {
    3
}

impl AppConfig {
    /// Validates the configuration once at startup.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidConfig` naming the offending field.
    /// Trading-relevant fields fail hard here rather than falling back to
    /// defaults.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.aggregation.bucket_window()?;

        if !self.aggregation.decay_half_life.is_finite() || self.aggregation.decay_half_life <= 0.0
        {
            return Err(PipelineError::InvalidConfig(format!(
                "aggregation.decay_half_life must be positive, got {}",
                self.aggregation.decay_half_life
            )));
        }
        if self.model.horizon_bars < 1 {
            return Err(PipelineError::InvalidConfig(
                "model.horizon_bars must be at least 1".to_string(),
            ));
        }
        if self.model.cv_folds < 2 {
            return Err(PipelineError::InvalidConfig(
                "model.cv_folds must be at least 2".to_string(),
            ));
        }

        let long = self.signals.threshold_long;
        let short = self.signals.threshold_short;
        if !long.is_finite() || !(0.0..=1.0).contains(&long) {
            return Err(PipelineError::InvalidConfig(format!(
                "signals.threshold_long must be in [0, 1], got {long}"
            )));
        }
        if !short.is_finite() || !(0.0..=1.0).contains(&short) {
            return Err(PipelineError::InvalidConfig(format!(
                "signals.threshold_short must be in [0, 1], got {short}"
            )));
        }
        if short >= long {
            return Err(PipelineError::InvalidConfig(format!(
                "signals.threshold_short ({short}) must be below signals.threshold_long ({long})"
            )));
        }
        if !self.signals.costs_bps.is_finite() || self.signals.costs_bps < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "signals.costs_bps must be non-negative, got {}",
                self.signals.costs_bps
            )));
        }

        if self.sentiment.batch_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "sentiment.batch_size must be at least 1".to_string(),
            ));
        }
        if self.sentiment.backend == "remote" && self.sentiment.endpoint.is_none() {
            return Err(PipelineError::InvalidConfig(
                "sentiment.endpoint is required when sentiment.backend is \"remote\"".to_string(),
            ));
        }

        let wf = &self.walk_forward;
        if !(0.0..1.0).contains(&wf.train_frac) || wf.train_frac <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "walk_forward.train_frac must be in (0, 1), got {}",
                wf.train_frac
            )));
        }
        if !(0.0..=1.0).contains(&wf.step_frac) || wf.step_frac <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "walk_forward.step_frac must be in (0, 1], got {}",
                wf.step_frac
            )));
        }
        if let Some(frac) = wf.window_frac {
            if !(0.0..=1.0).contains(&frac) || frac <= 0.0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "walk_forward.window_frac must be in (0, 1], got {frac}"
                )));
            }
        }
        if wf.min_train_samples == 0 {
            return Err(PipelineError::InvalidConfig(
                "walk_forward.min_train_samples must be at least 1".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(PipelineError::InvalidConfig(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            aggregation: AggregationConfig {
                window: "W-MON".to_string(),
                decay_half_life: 1.0,
            },
            model: ModelConfig {
                horizon_bars: 1,
                path: default_model_path(),
                min_train_samples: default_min_train_samples(),
                cv_folds: default_cv_folds(),
            },
            signals: SignalConfig {
                threshold_long: 0.62,
                threshold_short: 0.38,
                costs_bps: 10.0,
            },
            ingest: IngestConfig::default(),
            sentiment: SentimentConfig::default(),
            prices: PriceConfig::default(),
            walk_forward: WalkForwardSettings::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            alerts: AlertsConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}
