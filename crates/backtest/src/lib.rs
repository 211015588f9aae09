//! Backtesting and walk-forward evaluation for sentiment signal models.
//!
//! This crate provides:
//! - A single-split backtester replaying labeled bars through a trained model
//! - A walk-forward evaluator that retrains per fold and pools out-of-sample scores
//! - Markdown report rendering for both

pub mod backtester;
pub mod report;
pub mod walk_forward;

pub use backtester::{BacktestResult, Backtester, EquityPoint, PerformanceMetrics};
pub use report::{render_backtest_report, render_walk_forward_report, write_report};
pub use walk_forward::{FoldMetrics, WalkForward, WalkForwardReport, WalkForwardSummary};
