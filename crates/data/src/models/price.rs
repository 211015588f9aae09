//! External price observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One close observation from a price source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PriceObservation {
    #[must_use]
    pub fn new(ticker: impl Into<String>, timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            ticker: ticker.into(),
            timestamp,
            close,
        }
    }
}
