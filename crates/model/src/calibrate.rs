//! Isotonic calibration of raw classifier scores.
//!
//! Fits a non-decreasing step-linear function from raw scores to observed
//! outcome rates using pool-adjacent-violators, the standard way to turn a
//! merely monotonic score into a usable probability. Scores outside the
//! fitted range clip to the boundary values.

use serde::{Deserialize, Serialize};

/// A fitted isotonic regression: ascending thresholds with non-decreasing
/// calibrated values, interpolated linearly between breakpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IsotonicRegression {
    thresholds: Vec<f64>,
    values: Vec<f64>,
}

impl IsotonicRegression {
    /// Fits on (raw score, binary target) pairs. Non-finite pairs are
    /// dropped; duplicate scores are merged by weighted target mean before
    /// pooling.
    #[must_use]
    pub fn fit(scores: &[f64], targets: &[f64]) -> Self {
        let mut pairs: Vec<(f64, f64)> = scores
            .iter()
            .zip(targets.iter())
            .filter(|(s, t)| s.is_finite() && t.is_finite())
            .map(|(s, t)| (*s, *t))
            .collect();
        if pairs.is_empty() {
            return Self::default();
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Collapse duplicate scores to one weighted point each.
        let mut points: Vec<(f64, f64, f64)> = Vec::with_capacity(pairs.len());
        for (score, target) in pairs {
            match points.last_mut() {
                Some((x, y, w)) if (*x - score).abs() < f64::EPSILON => {
                    *y = (*y * *w + target) / (*w + 1.0);
                    *w += 1.0;
                }
                _ => points.push((score, target, 1.0)),
            }
        }

        // Pool adjacent violators: merge backwards whenever the mean dips.
        // Each block tracks (mean, weight, last point index).
        let mut blocks: Vec<(f64, f64, usize)> = Vec::with_capacity(points.len());
        for (i, (_, y, w)) in points.iter().enumerate() {
            blocks.push((*y, *w, i));
            while blocks.len() >= 2 {
                let (m2, w2, end2) = blocks[blocks.len() - 1];
                let (m1, w1, _) = blocks[blocks.len() - 2];
                if m1 <= m2 {
                    break;
                }
                blocks.pop();
                blocks.pop();
                let w = w1 + w2;
                blocks.push(((m1 * w1 + m2 * w2) / w, w, end2));
            }
        }

        let thresholds: Vec<f64> = points.iter().map(|(x, _, _)| *x).collect();
        let mut values = Vec::with_capacity(points.len());
        let mut block_iter = blocks.iter();
        let mut current = block_iter.next();
        for i in 0..points.len() {
            while let Some((_, _, end)) = current {
                if i <= *end {
                    break;
                }
                current = block_iter.next();
            }
            match current {
                Some((mean, _, _)) => values.push(*mean),
                None => values.push(points[i].1),
            }
        }

        Self { thresholds, values }
    }

    /// Maps a raw score through the fitted curve. An empty (degenerate)
    /// calibrator passes the score through clamped to [0, 1].
    #[must_use]
    pub fn transform(&self, score: f64) -> f64 {
        if self.thresholds.is_empty() {
            return score.clamp(0.0, 1.0);
        }
        let last = self.thresholds.len() - 1;
        if score <= self.thresholds[0] {
            return self.values[0];
        }
        if score >= self.thresholds[last] {
            return self.values[last];
        }

        let hi = self.thresholds.partition_point(|t| *t < score);
        let lo = hi - 1;
        let span = self.thresholds[hi] - self.thresholds[lo];
        if span <= f64::EPSILON {
            return self.values[hi];
        }
        let frac = (score - self.thresholds[lo]) / span;
        self.values[lo] + frac * (self.values[hi] - self.values[lo])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
