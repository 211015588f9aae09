//! Bucket aggregation of scored mentions into sentiment bars.
//!
//! This is the centerpiece reduction of the pipeline: scored,
//! ticker-tagged mentions go in, one [`SentimentBar`] per (ticker, bucket)
//! with at least one mention comes out. Buckets with no mentions are never
//! emitted; consumers treat a missing bar as "no signal", not zero signal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sentibar_core::BucketWindow;
use sentibar_data::models::{ScoredMention, SentimentBar};

/// Aggregates scored mentions into per-(ticker, bucket) sentiment bars.
pub struct BucketAggregator {
    window: BucketWindow,
    half_life: f64,
}

impl BucketAggregator {
    /// `half_life` is the number of in-bucket positions after which an
    /// older mention's weight halves relative to the most recent one.
    /// Must be positive; configuration validation enforces this upstream.
    #[must_use]
    pub fn new(window: BucketWindow, half_life: f64) -> Self {
        Self { window, half_life }
    }

    #[must_use]
    pub fn window(&self) -> BucketWindow {
        self.window
    }

    /// Reduces mentions into bars, sorted by (ticker, bucket_start).
    ///
    /// Each group is sorted by published time (mention id as tiebreaker) so
    /// the decay weighting and floating-point accumulation order are stable
    /// across runs: re-aggregating a superset of articles reproduces
    /// untouched buckets exactly.
    #[must_use]
    pub fn aggregate(&self, mentions: &[ScoredMention]) -> Vec<SentimentBar> {
        let mut groups: BTreeMap<(String, DateTime<Utc>), Vec<&ScoredMention>> = BTreeMap::new();
        for mention in mentions {
            let bucket_start = self.window.floor(mention.published_at);
            groups
                .entry((mention.ticker.clone(), bucket_start))
                .or_default()
                .push(mention);
        }

        let mut bars = Vec::with_capacity(groups.len());
        for ((ticker, bucket_start), mut group) in groups {
            group.sort_by(|a, b| {
                a.published_at
                    .cmp(&b.published_at)
                    .then_with(|| a.article_id.cmp(&b.article_id))
            });
            bars.push(self.reduce_group(ticker, bucket_start, &group));
        }

        tracing::debug!("Aggregated {} mentions into {} bars", mentions.len(), bars.len());
        bars
    }

    fn reduce_group(
        &self,
        ticker: String,
        bucket_start: DateTime<Utc>,
        group: &[&ScoredMention],
    ) -> SentimentBar {
        let count = group.len() as u64;

        // NaN scores are excluded from the statistics; a group with no
        // finite score at all reports NaN rather than a fabricated number.
        let scores: Vec<f64> = group
            .iter()
            .map(|m| m.sentiment.score)
            .filter(|s| s.is_finite())
            .collect();
        let neus: Vec<f64> = group
            .iter()
            .map(|m| m.sentiment.neu)
            .filter(|n| n.is_finite())
            .collect();

        let (mean_sent, std_sent, min_sent, max_sent) = score_stats(&scores);
        let unc_mean = mean(&neus);
        let time_decay_mean = self.decayed_mean(&scores, mean_sent);

        SentimentBar {
            ticker,
            bucket_start,
            mean_sent,
            std_sent,
            min_sent,
            max_sent,
            count,
            unc_mean,
            time_decay_mean,
        }
    }

    /// Exponentially decayed mean over scores in published-time order.
    ///
    /// The weight of the score `k` positions before the most recent one is
    /// `0.5^(k / half_life)`, so the latest mention always dominates. Falls
    /// back to the plain mean when the weighting degenerates.
    fn decayed_mean(&self, scores: &[f64], plain_mean: f64) -> f64 {
        if scores.len() <= 1 {
            return plain_mean;
        }

        let decay = 0.5_f64.powf(1.0 / self.half_life);
        if !decay.is_finite() || decay <= 0.0 {
            return plain_mean;
        }

        let n = scores.len();
        let mut weighted = 0.0;
        let mut total = 0.0;
        for (i, score) in scores.iter().enumerate() {
            let weight = decay.powi((n - 1 - i) as i32);
            weighted += weight * score;
            total += weight;
        }

        if total > 0.0 && total.is_finite() {
            weighted / total
        } else {
            plain_mean
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean, sample standard deviation (ddof = 1, zero for a single value),
/// min, and max. All NaN when `scores` is empty.
fn score_stats(scores: &[f64]) -> (f64, f64, f64, f64) {
    if scores.is_empty() {
        return (f64::NAN, f64::NAN, f64::NAN, f64::NAN);
    }

    let mean_sent = mean(scores);
    let std_sent = if scores.len() == 1 {
        0.0
    } else {
        let ss: f64 = scores.iter().map(|s| (s - mean_sent).powi(2)).sum();
        (ss / (scores.len() - 1) as f64).sqrt()
    };
    let min_sent = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max_sent = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    (mean_sent, std_sent, min_sent, max_sent)
}

// ============================================================================
// Tests
// ============================================================================
