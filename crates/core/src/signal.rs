//! Serving-time decision mapping.
//!
//! A calibrated probability of an upward move is turned into a discrete
//! position decision by comparing it against the configured thresholds.
//! Both comparisons are strict, so a probability sitting exactly on a
//! threshold resolves to [`Decision::Hold`].

use serde::{Deserialize, Serialize};

use crate::config::SignalConfig;

/// Discrete position decision derived from a calibrated up-move probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Probability cleared the long threshold.
    Long,
    /// Probability fell below the short threshold.
    Short,
    /// Neither threshold was crossed.
    Hold,
}

impl Decision {
    /// Maps a probability through the configured thresholds.
    #[must_use]
    pub fn from_probability(prob: f64, signals: &SignalConfig) -> Self {
        Self::from_thresholds(prob, signals.threshold_long, signals.threshold_short)
    }

    /// Maps a probability through explicit thresholds (callers may override
    /// the configured ones per request).
    #[must_use]
    pub fn from_thresholds(prob: f64, threshold_long: f64, threshold_short: f64) -> Self {
        if prob > threshold_long {
            Self::Long
        } else if prob < threshold_short {
            Self::Short
        } else {
            Self::Hold
        }
    }

    /// Lowercase name used in API payloads and alert events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
            Self::Hold => "hold",
        }
    }

    /// Whether the decision calls for taking a position at all.
    #[must_use]
    pub const fn is_actionable(self) -> bool {
        !matches!(self, Self::Hold)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
