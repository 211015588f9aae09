//! Supervised training rows: sentiment bars joined to forward returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SentimentBar;

/// One labeled row of the training table.
///
/// `close_fwd` is the bucket close `horizon` buckets ahead within the same
/// ticker; rows without a forward close are dropped at labeling time, so a
/// persisted `TrainingRow` always has a defined label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub ticker: String,
    pub bucket_start: DateTime<Utc>,
    pub mean_sent: f64,
    pub std_sent: f64,
    pub min_sent: f64,
    pub max_sent: f64,
    pub count: u64,
    pub unc_mean: f64,
    pub time_decay_mean: f64,
    pub close: f64,
    pub close_fwd: f64,
    /// Forward return: `close_fwd / close - 1`.
    pub r_fwd: f64,
    /// 1 iff `r_fwd > 0` strictly; a flat forward return labels as 0.
    pub y: u8,
}

impl TrainingRow {
    /// Joins a bar with its aligned and forward closes, deriving the label.
    #[must_use]
    pub fn from_bar(bar: &SentimentBar, close: f64, close_fwd: f64) -> Self {
        let r_fwd = close_fwd / close - 1.0;
        Self {
            ticker: bar.ticker.clone(),
            bucket_start: bar.bucket_start,
            mean_sent: bar.mean_sent,
            std_sent: bar.std_sent,
            min_sent: bar.min_sent,
            max_sent: bar.max_sent,
            count: bar.count,
            unc_mean: bar.unc_mean,
            time_decay_mean: bar.time_decay_mean,
            close,
            close_fwd,
            r_fwd,
            y: u8::from(r_fwd > 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar() -> SentimentBar {
        SentimentBar {
            ticker: "X".to_string(),
            bucket_start: Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
            mean_sent: 0.2,
            std_sent: 0.0,
            min_sent: 0.2,
            max_sent: 0.2,
            count: 1,
            unc_mean: 0.4,
            time_decay_mean: 0.2,
        }
    }

    #[test]
    fn forward_return_and_label_derive_from_closes() {
        let row = TrainingRow::from_bar(&bar(), 10.0, 11.0);
        assert!((row.r_fwd - 0.10).abs() < 1e-12);
        assert_eq!(row.y, 1);
    }

    #[test]
    fn negative_forward_return_labels_zero() {
        let row = TrainingRow::from_bar(&bar(), 11.0, 9.0);
        assert!(row.r_fwd < 0.0);
        assert_eq!(row.y, 0);
    }

    #[test]
    fn flat_forward_return_labels_zero() {
        // Strict inequality: an exactly flat forward return is "down".
        let row = TrainingRow::from_bar(&bar(), 10.0, 10.0);
        assert!((row.r_fwd).abs() < 1e-12);
        assert_eq!(row.y, 0);
    }
}
