//! Single-split event backtest for the probability strategy.
//!
//! Replays labeled bars in (ticker, bucket_start) order, asks the model for
//! a probability per bar, and simulates a long-only strategy that enters
//! whenever the probability clears the long threshold. Transaction costs are
//! charged per entered bar in basis points of notional.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use sentibar_core::stats::{auc_roc, brier_score};
use sentibar_core::{PipelineError, SignalConfig};
use sentibar_data::TrainingRow;
use sentibar_model::{FeatureFrame, ProbModel};
use serde::{Deserialize, Serialize};
use tracing::info;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// PnL for one bar: forward return minus costs when the probability clears
/// the long threshold strictly, otherwise flat.
pub(crate) fn threshold_pnl(prob: f64, r_fwd: f64, threshold_long: f64, costs: f64) -> f64 {
    if prob > threshold_long {
        r_fwd - costs
    } else {
        0.0
    }
}

/// Long-only threshold strategy evaluated over labeled sentiment bars.
#[derive(Debug, Clone)]
pub struct Backtester {
    threshold_long: f64,
    costs_bps: f64,
}

impl Backtester {
    /// Creates a backtester entering long above `threshold_long` and paying
    /// `costs_bps` basis points per entered bar.
    #[must_use]
    pub fn new(threshold_long: f64, costs_bps: f64) -> Self {
        Self {
            threshold_long,
            costs_bps,
        }
    }

    /// Creates a backtester from the signal section of the app config.
    #[must_use]
    pub fn from_config(signals: &SignalConfig) -> Self {
        Self::new(signals.threshold_long, signals.costs_bps)
    }

    /// Runs the backtest: sorts rows by (ticker, bucket_start), predicts a
    /// probability per bar, and evaluates the threshold strategy.
    ///
    /// Rows are sorted before prediction so probabilities stay aligned with
    /// the bars they were computed for.
    ///
    /// # Errors
    /// Returns [`PipelineError::InsufficientData`] when `rows` is empty.
    pub fn run(
        &self,
        rows: &[TrainingRow],
        model: &ProbModel,
    ) -> Result<BacktestResult, PipelineError> {
        if rows.is_empty() {
            return Err(PipelineError::InsufficientData(
                "backtest received no labeled rows".to_string(),
            ));
        }

        let mut ordered = rows.to_vec();
        ordered.sort_by(|a, b| {
            a.ticker
                .cmp(&b.ticker)
                .then_with(|| a.bucket_start.cmp(&b.bucket_start))
        });

        let frame = FeatureFrame::from_training_rows(&ordered);
        let probs = model.predict_proba(&frame);

        info!(
            "Backtesting {} rows at long threshold {}",
            ordered.len(),
            self.threshold_long
        );

        let result = self.evaluate(&ordered, &probs)?;

        info!(
            "Backtest complete. Sharpe: {:.4}, AUC: {:.4}",
            result.metrics.sharpe, result.metrics.auc
        );

        Ok(result)
    }

    /// Evaluates the strategy over rows in the order given, pairing each row
    /// with its probability. `run` is the sorted entry point; this lower
    /// level exists so fold evaluation can reuse the same PnL rules.
    ///
    /// # Errors
    /// Returns [`PipelineError::InsufficientData`] when `rows` is empty and
    /// [`PipelineError::ModelInference`] when `probs` and `rows` disagree in
    /// length.
    pub fn evaluate(
        &self,
        rows: &[TrainingRow],
        probs: &[f64],
    ) -> Result<BacktestResult, PipelineError> {
        if rows.is_empty() {
            return Err(PipelineError::InsufficientData(
                "backtest received no labeled rows".to_string(),
            ));
        }
        if probs.len() != rows.len() {
            return Err(PipelineError::ModelInference(format!(
                "probability count {} does not match row count {}",
                probs.len(),
                rows.len()
            )));
        }

        let costs = self.costs_bps * 1e-4;
        let mut curve = Vec::with_capacity(rows.len());
        let mut equity = 1.0_f64;
        let mut n_trades = 0_u64;

        for (row, &prob) in rows.iter().zip(probs) {
            let pnl = threshold_pnl(prob, row.r_fwd, self.threshold_long, costs);
            if prob > self.threshold_long {
                n_trades += 1;
            }
            equity *= 1.0 + pnl;
            curve.push(EquityPoint {
                ticker: row.ticker.clone(),
                bucket_start: row.bucket_start,
                probability: prob,
                pnl,
                equity,
            });
        }

        let labels: Vec<u8> = rows.iter().map(|r| r.y).collect();
        let wins = curve.iter().filter(|p| p.pnl > 0.0).count();
        let gross_positive: f64 = curve.iter().map(|p| p.pnl).filter(|v| *v > 0.0).sum();
        let gross_negative: f64 = curve.iter().map(|p| p.pnl).filter(|v| *v < 0.0).sum();
        let profit_factor = if gross_negative == 0.0 {
            f64::INFINITY
        } else {
            (gross_positive / gross_negative).abs()
        };

        let metrics = PerformanceMetrics {
            total_return: equity - 1.0,
            win_rate: wins as f64 / rows.len() as f64,
            profit_factor,
            sharpe: sharpe_from_curve(&curve),
            max_drawdown: max_drawdown_from_curve(&curve),
            n_trades,
            auc: auc_roc(&labels, probs),
            brier: brier_score(&labels, probs),
        };

        Ok(BacktestResult { metrics, curve })
    }
}

/// Aggregate performance and model-quality metrics for one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Final equity minus the 1.0 starting stake.
    pub total_return: f64,
    /// Fraction of all evaluated bars with strictly positive PnL.
    pub win_rate: f64,
    /// Gross profits over absolute gross losses; infinite when no bar lost.
    pub profit_factor: f64,
    /// Annualized Sharpe ratio from daily-resampled equity.
    pub sharpe: f64,
    /// Most negative peak-to-trough equity move, as a fraction (<= 0).
    pub max_drawdown: f64,
    /// Number of bars where the probability cleared the long threshold.
    pub n_trades: u64,
    /// AUC-ROC of raw probabilities against labels.
    pub auc: f64,
    /// Brier score of raw probabilities against labels.
    pub brier: f64,
}

/// One evaluated bar: the probability the model assigned, the PnL the
/// strategy realized, and the equity level after applying it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub ticker: String,
    pub bucket_start: DateTime<Utc>,
    pub probability: f64,
    pub pnl: f64,
    pub equity: f64,
}

/// Full result of a single-split backtest.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub metrics: PerformanceMetrics,
    pub curve: Vec<EquityPoint>,
}

/// Annualized Sharpe ratio from the equity curve, resampled to one value
/// per civil day (the last equity written for that day). Returns 0.0 when
/// fewer than two daily returns exist or their deviation is zero.
fn sharpe_from_curve(curve: &[EquityPoint]) -> f64 {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for point in curve {
        daily.insert(point.bucket_start.date_naive(), point.equity);
    }

    let equities: Vec<f64> = daily.values().copied().collect();
    let returns: Vec<f64> = equities.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
        / (returns.len() - 1) as f64;
    let std = variance.sqrt();
    if std == 0.0 {
        return 0.0;
    }

    mean / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Most negative (equity - running peak) / running peak over the curve.
fn max_drawdown_from_curve(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for point in curve {
        if point.equity > peak {
            peak = point.equity;
        }
        let drawdown = (point.equity - peak) / peak;
        if drawdown < max_dd {
            max_dd = drawdown;
        }
    }
    max_dd
}
