//! Markdown reports for backtest and walk-forward results.

#![allow(clippy::format_push_string)]

use std::fs;
use std::path::Path;

use sentibar_core::PipelineError;
use tracing::info;

use crate::backtester::PerformanceMetrics;
use crate::walk_forward::WalkForwardReport;

/// Renders single-split backtest metrics as a markdown report.
#[must_use]
pub fn render_backtest_report(metrics: &PerformanceMetrics) -> String {
    let mut out = String::new();

    out.push_str("# Backtest Report\n\n");
    out.push_str("## Performance Metrics\n\n");
    out.push_str("| Metric | Value |\n");
    out.push_str("|--------|-------|\n");
    out.push_str(&format!(
        "| Total Return | {:.2}% |\n",
        metrics.total_return * 100.0
    ));
    out.push_str(&format!("| Win Rate | {:.2}% |\n", metrics.win_rate * 100.0));
    out.push_str(&format!(
        "| Profit Factor | {:.2} |\n",
        metrics.profit_factor
    ));
    out.push_str(&format!("| Sharpe Ratio | {:.2} |\n", metrics.sharpe));
    out.push_str(&format!(
        "| Max Drawdown | {:.2}% |\n",
        metrics.max_drawdown * 100.0
    ));
    out.push_str(&format!("| Trades | {} |\n", metrics.n_trades));
    out.push('\n');
    out.push_str("## Model Quality\n\n");
    out.push_str("| Metric | Value |\n");
    out.push_str("|--------|-------|\n");
    out.push_str(&format!("| AUC-ROC | {:.4} |\n", metrics.auc));
    out.push_str(&format!("| Brier Score | {:.4} |\n", metrics.brier));
    out.push('\n');
    out.push_str("---\n");
    out.push_str("*Report generated automatically by the sentibar backtester.*\n");

    out
}

/// Renders walk-forward folds and their summary as a markdown report.
#[must_use]
pub fn render_walk_forward_report(report: &WalkForwardReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    out.push_str("# Walk-Forward Report\n\n");
    out.push_str("## Folds\n\n");
    out.push_str("| Fold | Train | Test | AUC | Brier | Accuracy | Trades | Return |\n");
    out.push_str("|------|-------|------|-----|-------|----------|--------|--------|\n");
    for fold in &report.folds {
        out.push_str(&format!(
            "| {} | {} | {} | {:.4} | {:.4} | {:.4} | {} | {:.2}% |\n",
            fold.fold,
            fold.train_size,
            fold.test_size,
            fold.auc,
            fold.brier,
            fold.accuracy,
            fold.n_trades,
            fold.fold_return * 100.0
        ));
    }
    out.push('\n');
    out.push_str("## Summary\n\n");
    out.push_str("| Metric | Value |\n");
    out.push_str("|--------|-------|\n");
    out.push_str(&format!("| Folds | {} |\n", summary.n_folds));
    out.push_str(&format!("| Avg AUC | {:.4} |\n", summary.avg_auc));
    out.push_str(&format!("| Avg Brier | {:.4} |\n", summary.avg_brier));
    out.push_str(&format!("| Avg Accuracy | {:.4} |\n", summary.avg_accuracy));
    out.push_str(&format!("| Overall AUC | {:.4} |\n", summary.overall_auc));
    out.push_str(&format!("| Overall Brier | {:.4} |\n", summary.overall_brier));
    out.push_str(&format!(
        "| Total Return | {:.2}% |\n",
        summary.total_return * 100.0
    ));
    out.push_str(&format!("| Test Samples | {} |\n", summary.total_samples));
    out.push('\n');
    out.push_str("---\n");
    out.push_str("*Report generated automatically by the sentibar walk-forward evaluator.*\n");

    out
}

/// Writes a rendered report, creating parent directories as needed.
///
/// # Errors
/// Returns [`PipelineError::Storage`] when the path cannot be written.
pub fn write_report(path: &Path, contents: &str) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    info!("Saved report to {}", path.display());
    Ok(())
}
