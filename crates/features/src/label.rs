//! Forward-return labeling of sentiment bars.
//!
//! Joins sentiment bars against bucket-resampled close prices and attaches
//! the supervised target: the sign of the forward return `horizon_bars`
//! buckets ahead. The policy is strict: `y = 1` only when `r_fwd > 0`, so a
//! flat forward return labels as down. That boundary is deliberate and
//! covered by tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sentibar_core::BucketWindow;
use sentibar_data::models::{PriceObservation, SentimentBar, TrainingRow};

/// Builds the supervised training table from bars and raw prices.
pub struct Labeler {
    window: BucketWindow,
    horizon_bars: u32,
}

impl Labeler {
    #[must_use]
    pub fn new(window: BucketWindow, horizon_bars: u32) -> Self {
        Self {
            window,
            horizon_bars,
        }
    }

    /// Resamples prices to the bar window (last close within each bucket),
    /// inner-joins bars to closes on (ticker, bucket_start), and computes
    /// forward returns within each ticker's joined series.
    ///
    /// Bars without a matching price bucket are dropped, as are the trailing
    /// rows of each ticker where no forward close exists. Empty inputs yield
    /// an empty table; deciding whether that halts the run belongs to the
    /// caller.
    #[must_use]
    pub fn label(&self, bars: &[SentimentBar], prices: &[PriceObservation]) -> Vec<TrainingRow> {
        let closes = self.resample_last_close(prices);

        // Per-ticker joined series, ordered by bucket_start.
        let mut joined: BTreeMap<&str, Vec<(&SentimentBar, f64)>> = BTreeMap::new();
        let mut sorted_bars: Vec<&SentimentBar> = bars.iter().collect();
        sorted_bars.sort_by(|a, b| a.key().cmp(&b.key()));
        for bar in sorted_bars {
            if let Some(&(_, close)) = closes.get(&(bar.ticker.as_str(), bar.bucket_start)) {
                joined.entry(bar.ticker.as_str()).or_default().push((bar, close));
            }
        }

        let horizon = self.horizon_bars as usize;
        let mut rows = Vec::new();
        for series in joined.values() {
            if series.len() <= horizon {
                continue;
            }
            for i in 0..series.len() - horizon {
                let (bar, close) = series[i];
                let (_, close_fwd) = series[i + horizon];
                rows.push(TrainingRow::from_bar(bar, close, close_fwd));
            }
        }

        tracing::debug!(
            "Labeled {} of {} bars against {} price observations",
            rows.len(),
            bars.len(),
            prices.len()
        );
        rows
    }

    /// Last observed close per (ticker, bucket), keyed for the join. The
    /// stored timestamp picks the winner when several observations share a
    /// bucket.
    fn resample_last_close<'a>(
        &self,
        prices: &'a [PriceObservation],
    ) -> BTreeMap<(&'a str, DateTime<Utc>), (DateTime<Utc>, f64)> {
        let mut closes: BTreeMap<(&str, DateTime<Utc>), (DateTime<Utc>, f64)> = BTreeMap::new();
        for obs in prices {
            let bucket_start = self.window.floor(obs.timestamp);
            closes
                .entry((obs.ticker.as_str(), bucket_start))
                .and_modify(|slot| {
                    if obs.timestamp >= slot.0 {
                        *slot = (obs.timestamp, obs.close);
                    }
                })
                .or_insert((obs.timestamp, obs.close));
        }
        closes
    }
}

// ============================================================================
// Tests
// ============================================================================
