//! Walk-forward evaluation: retrain on the past, test on the step ahead.
//!
//! Splits the time-ordered training table into an initial window and a
//! sequence of forward test slices. Each fold fits a fresh probability model
//! on its training window (expanding from the start, or rolling with a fixed
//! width) and scores the slice the model has never seen. Fold metrics are
//! averaged and all out-of-sample predictions are pooled for overall scores,
//! which is the number that should decide whether a model ships.

use sentibar_core::stats::{accuracy, auc_roc, brier_score};
use sentibar_core::{PipelineError, WalkForwardSettings};
use sentibar_data::TrainingRow;
use sentibar_model::{FeatureFrame, ProbModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backtester::threshold_pnl;

const DEFAULT_CV_FOLDS: usize = 3;

/// Walk-forward evaluator over a labeled training table.
#[derive(Debug, Clone)]
pub struct WalkForward {
    train_frac: f64,
    step_frac: f64,
    expanding: bool,
    window_frac: Option<f64>,
    min_train_samples: usize,
    cv_folds: usize,
}

impl Default for WalkForward {
    fn default() -> Self {
        let settings = WalkForwardSettings::default();
        Self {
            train_frac: settings.train_frac,
            step_frac: settings.step_frac,
            expanding: settings.expanding,
            window_frac: settings.window_frac,
            min_train_samples: settings.min_train_samples,
            cv_folds: DEFAULT_CV_FOLDS,
        }
    }
}

impl WalkForward {
    /// Creates an evaluator with the default expanding-window settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an evaluator from the config file section, with the model's
    /// configured calibration fold count.
    #[must_use]
    pub fn from_settings(settings: &WalkForwardSettings, cv_folds: usize) -> Self {
        Self {
            train_frac: settings.train_frac,
            step_frac: settings.step_frac,
            expanding: settings.expanding,
            window_frac: settings.window_frac,
            min_train_samples: settings.min_train_samples,
            cv_folds,
        }
    }

    /// Sets the initial training window as a fraction of total rows.
    #[must_use]
    pub fn with_train_frac(mut self, train_frac: f64) -> Self {
        self.train_frac = train_frac;
        self
    }

    /// Sets the forward step as a fraction of total rows.
    #[must_use]
    pub fn with_step_frac(mut self, step_frac: f64) -> Self {
        self.step_frac = step_frac;
        self
    }

    /// Switches between expanding (true) and rolling (false) training windows.
    #[must_use]
    pub fn with_expanding(mut self, expanding: bool) -> Self {
        self.expanding = expanding;
        self
    }

    /// Sets the rolling window width as a fraction of total rows. Only read
    /// when expanding is off; defaults to `train_frac`.
    #[must_use]
    pub fn with_window_frac(mut self, window_frac: f64) -> Self {
        self.window_frac = Some(window_frac);
        self
    }

    /// Sets the minimum rows the initial training window must hold.
    #[must_use]
    pub fn with_min_train_samples(mut self, min_train_samples: usize) -> Self {
        self.min_train_samples = min_train_samples;
        self
    }

    /// Sets the calibration fold count forwarded to each fold's model fit.
    #[must_use]
    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    /// Runs the walk-forward evaluation with the long-only threshold
    /// strategy applied to each test slice.
    ///
    /// # Errors
    /// Returns [`PipelineError::InsufficientData`] when the initial training
    /// window is smaller than `min_train_samples` or when no test fold can
    /// be formed, and propagates model fitting failures.
    pub fn run(
        &self,
        rows: &[TrainingRow],
        threshold_long: f64,
        costs_bps: f64,
    ) -> Result<WalkForwardReport, PipelineError> {
        let mut ordered = rows.to_vec();
        ordered.sort_by(|a, b| a.bucket_start.cmp(&b.bucket_start));

        let n = ordered.len();
        let initial_train_end = (n as f64 * self.train_frac) as usize;
        let step = (n as f64 * self.step_frac) as usize;

        if initial_train_end < self.min_train_samples {
            return Err(PipelineError::InsufficientData(format!(
                "walk-forward needs at least {} training rows, initial window has {}",
                self.min_train_samples, initial_train_end
            )));
        }

        let window = (n as f64 * self.window_frac.unwrap_or(self.train_frac)) as usize;
        let costs = costs_bps * 1e-4;

        let mut folds: Vec<FoldMetrics> = Vec::new();
        let mut pooled_labels: Vec<u8> = Vec::new();
        let mut pooled_probs: Vec<f64> = Vec::new();

        let mut train_end = initial_train_end;
        while train_end < n.saturating_sub(1) {
            let test_end = (train_end + step).min(n);
            if test_end <= train_end {
                break;
            }

            let train_start = if self.expanding {
                0
            } else {
                train_end.saturating_sub(window)
            };
            let train_rows = &ordered[train_start..train_end];
            let test_rows = &ordered[train_end..test_end];

            debug!(
                "Fold {}: train [{}..{}], test [{}..{}]",
                folds.len(),
                train_start,
                train_end,
                train_end,
                test_end
            );

            let train_frame = FeatureFrame::from_training_rows(train_rows);
            let y_train: Vec<u8> = train_rows.iter().map(|r| r.y).collect();
            let model = ProbModel::fit(&train_frame, &y_train, self.cv_folds)?;

            let test_frame = FeatureFrame::from_training_rows(test_rows);
            let probs = model.predict_proba(&test_frame);
            let y_test: Vec<u8> = test_rows.iter().map(|r| r.y).collect();

            let mut fold_equity = 1.0_f64;
            let mut wins = 0_usize;
            let mut n_trades = 0_u64;
            for (row, &prob) in test_rows.iter().zip(&probs) {
                let pnl = threshold_pnl(prob, row.r_fwd, threshold_long, costs);
                if prob > threshold_long {
                    n_trades += 1;
                }
                if pnl > 0.0 {
                    wins += 1;
                }
                fold_equity *= 1.0 + pnl;
            }

            folds.push(FoldMetrics {
                fold: folds.len(),
                train_size: train_rows.len(),
                test_size: test_rows.len(),
                auc: auc_roc(&y_test, &probs),
                brier: brier_score(&y_test, &probs),
                accuracy: accuracy(&y_test, &probs),
                n_trades,
                win_rate: wins as f64 / test_rows.len() as f64,
                fold_return: fold_equity - 1.0,
            });

            pooled_labels.extend_from_slice(&y_test);
            pooled_probs.extend(&probs);

            train_end = test_end;
        }

        if folds.is_empty() {
            return Err(PipelineError::InsufficientData(
                "walk-forward produced no test folds".to_string(),
            ));
        }

        let n_folds = folds.len();
        let avg_auc = folds.iter().map(|f| f.auc).sum::<f64>() / n_folds as f64;
        let avg_brier = folds.iter().map(|f| f.brier).sum::<f64>() / n_folds as f64;
        let avg_accuracy = folds.iter().map(|f| f.accuracy).sum::<f64>() / n_folds as f64;
        let total_return = folds
            .iter()
            .map(|f| 1.0 + f.fold_return)
            .product::<f64>()
            - 1.0;

        let summary = WalkForwardSummary {
            n_folds,
            avg_auc,
            avg_brier,
            avg_accuracy,
            overall_auc: auc_roc(&pooled_labels, &pooled_probs),
            overall_brier: brier_score(&pooled_labels, &pooled_probs),
            total_return,
            total_samples: folds.iter().map(|f| f.test_size).sum(),
        };

        info!(
            "Walk-forward complete: {} folds, avg AUC {:.4}, pooled AUC {:.4}",
            n_folds, summary.avg_auc, summary.overall_auc
        );

        Ok(WalkForwardReport { folds, summary })
    }
}

/// Out-of-sample metrics for one walk-forward fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// AUC over the test slice; 0.5 when its labels are single-class.
    pub auc: f64,
    pub brier: f64,
    pub accuracy: f64,
    /// Bars in the test slice where the probability cleared the threshold.
    pub n_trades: u64,
    /// Fraction of test bars with strictly positive PnL.
    pub win_rate: f64,
    /// Compounded threshold-strategy return over the test slice.
    pub fold_return: f64,
}

/// Cross-fold averages plus pooled out-of-sample scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    pub n_folds: usize,
    pub avg_auc: f64,
    pub avg_brier: f64,
    pub avg_accuracy: f64,
    /// AUC over every out-of-sample prediction pooled together.
    pub overall_auc: f64,
    pub overall_brier: f64,
    /// Fold returns compounded in order.
    pub total_return: f64,
    pub total_samples: usize,
}

/// Per-fold records and their summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub folds: Vec<FoldMetrics>,
    pub summary: WalkForwardSummary,
}
