//! The core aggregate entity: one sentiment bar per (ticker, bucket).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decay-weighted sentiment statistics for one ticker in one time bucket.
///
/// Keyed by `(ticker, bucket_start)`. Bars are only ever emitted for
/// buckets with at least one matched article; a missing bar means "no
/// signal", not a zero signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentBar {
    pub ticker: String,
    pub bucket_start: DateTime<Utc>,
    pub mean_sent: f64,
    /// Sample standard deviation of scores; 0.0 for single-article buckets.
    pub std_sent: f64,
    pub min_sent: f64,
    pub max_sent: f64,
    pub count: u64,
    /// Mean neutral-class probability, a proxy for model uncertainty.
    pub unc_mean: f64,
    /// Exponentially decayed mean of scores in published order; the most
    /// recent article in the bucket carries the largest weight.
    pub time_decay_mean: f64,
}

impl SentimentBar {
    /// The upsert key.
    #[must_use]
    pub fn key(&self) -> (&str, DateTime<Utc>) {
        (&self.ticker, self.bucket_start)
    }
}
