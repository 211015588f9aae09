//! Price sources with tiered fallback.
//!
//! A [`PriceSource`] yields close prices for one ticker. Sources are stacked
//! inside a [`TieredPriceSource`]: the first tier that returns rows wins, and
//! every skipped tier is logged so a degraded run is visible in the output
//! rather than silent.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use sentibar_core::{PipelineError, PriceConfig};
use serde::Deserialize;

use crate::csv_storage::CsvStorage;
use crate::models::PriceObservation;

/// A provider of close prices for a single ticker.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Fetches close prices for `ticker` at the given interval over the
    /// given lookback period (e.g. `"1d"` / `"1y"`).
    ///
    /// # Errors
    /// Returns [`PipelineError::SourceUnavailable`] when the source cannot
    /// be reached or returns malformed data.
    async fn fetch(
        &self,
        ticker: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<PriceObservation>, PipelineError>;
}

// ============================================================================
// HTTP tier
// ============================================================================

/// One row of the quote endpoint's JSON response.
#[derive(Debug, Deserialize)]
struct QuoteRow {
    timestamp: DateTime<Utc>,
    close: f64,
}

/// Fetches prices from an HTTP quote endpoint.
///
/// The endpoint is expected to answer
/// `GET {base_url}?ticker={t}&interval={i}&period={p}` with a JSON array of
/// `{timestamp, close}` rows.
pub struct HttpPriceSource {
    http: Client,
    base_url: String,
}

impl HttpPriceSource {
    /// Creates a source against `base_url` with a bounded request timeout.
    ///
    /// # Errors
    /// Returns [`PipelineError::SourceUnavailable`] when the HTTP client
    /// cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PipelineError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::source_unavailable("price-http", e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    fn name(&self) -> &str {
        "price-http"
    }

    async fn fetch(
        &self,
        ticker: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<PriceObservation>, PipelineError> {
        let url = format!(
            "{}?ticker={}&interval={}&period={}",
            self.base_url, ticker, interval, period
        );
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PipelineError::source_unavailable("price-http", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::source_unavailable(
                "price-http",
                format!("quote endpoint returned {status}: {text}"),
            ));
        }

        let rows = response
            .json::<Vec<QuoteRow>>()
            .await
            .map_err(|e| PipelineError::source_unavailable("price-http", e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| PriceObservation::new(ticker, row.timestamp, row.close))
            .collect())
    }
}

// ============================================================================
// CSV tier
// ============================================================================

/// Reads prices for a ticker from a local CSV file.
///
/// Interval and period are ignored: the file holds whatever was generated or
/// exported into it. This is the demo / offline tier.
pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    fn name(&self) -> &str {
        "prices-csv"
    }

    async fn fetch(
        &self,
        ticker: &str,
        _interval: &str,
        _period: &str,
    ) -> Result<Vec<PriceObservation>, PipelineError> {
        let rows = CsvStorage::read_prices(&self.path)
            .map_err(|e| PipelineError::source_unavailable("prices-csv", e.to_string()))?;
        Ok(rows.into_iter().filter(|p| p.ticker == ticker).collect())
    }
}

// ============================================================================
// Tiered fallback
// ============================================================================

/// Tries a stack of price sources in order until one returns rows.
///
/// A tier that errors or comes back empty is logged and skipped. When every
/// tier is exhausted the result is `Ok` with an empty vector; deciding
/// whether that is fatal belongs to the pipeline stage, not the source.
#[derive(Default)]
pub struct TieredPriceSource {
    tiers: Vec<Box<dyn PriceSource>>,
}

impl TieredPriceSource {
    #[must_use]
    pub fn new() -> Self {
        Self { tiers: Vec::new() }
    }

    /// Appends a tier. Tiers are consulted in insertion order.
    #[must_use]
    pub fn with_tier(mut self, tier: Box<dyn PriceSource>) -> Self {
        self.tiers.push(tier);
        self
    }

    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }
}

#[async_trait]
impl PriceSource for TieredPriceSource {
    fn name(&self) -> &str {
        "tiered"
    }

    async fn fetch(
        &self,
        ticker: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<PriceObservation>, PipelineError> {
        for tier in &self.tiers {
            match tier.fetch(ticker, interval, period).await {
                Ok(prices) if !prices.is_empty() => {
                    tracing::info!(
                        "Fetched {} prices for {} from source '{}'",
                        prices.len(),
                        ticker,
                        tier.name()
                    );
                    return Ok(prices);
                }
                Ok(_) => {
                    tracing::warn!(
                        "Price source '{}' returned no rows for {}, trying next tier",
                        tier.name(),
                        ticker
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Price source '{}' failed for {}: {}, trying next tier",
                        tier.name(),
                        ticker,
                        e
                    );
                }
            }
        }

        tracing::warn!("All price sources exhausted for {}", ticker);
        Ok(Vec::new())
    }
}

/// Builds the configured price source stack.
///
/// The live HTTP tier goes first when an endpoint is configured; the demo
/// CSV tier is always installed last so offline runs still produce prices.
///
/// # Errors
/// Returns [`PipelineError::SourceUnavailable`] when the HTTP client cannot
/// be constructed.
pub fn build_price_source(config: &PriceConfig) -> Result<TieredPriceSource, PipelineError> {
    let mut source = TieredPriceSource::new();
    if let Some(endpoint) = &config.endpoint {
        let timeout = Duration::from_secs(config.timeout_secs);
        source = source.with_tier(Box::new(HttpPriceSource::new(endpoint, timeout)?));
    }
    Ok(source.with_tier(Box::new(CsvPriceSource::new(&config.demo_csv))))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    struct FailingSource;

    #[async_trait]
    impl PriceSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(
            &self,
            _ticker: &str,
            _interval: &str,
            _period: &str,
        ) -> Result<Vec<PriceObservation>, PipelineError> {
            Err(PipelineError::source_unavailable("failing", "down"))
        }
    }

    struct EmptySource;

    #[async_trait]
    impl PriceSource for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        async fn fetch(
            &self,
            _ticker: &str,
            _interval: &str,
            _period: &str,
        ) -> Result<Vec<PriceObservation>, PipelineError> {
            Ok(Vec::new())
        }
    }

    struct FixedSource(Vec<PriceObservation>);

    #[async_trait]
    impl PriceSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(
            &self,
            _ticker: &str,
            _interval: &str,
            _period: &str,
        ) -> Result<Vec<PriceObservation>, PipelineError> {
            Ok(self.0.clone())
        }
    }

    fn observation(ticker: &str, close: f64) -> PriceObservation {
        PriceObservation::new(
            ticker,
            Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
            close,
        )
    }

    #[tokio::test]
    async fn tiered_falls_through_failure_and_empty_to_first_rows() {
        let source = TieredPriceSource::new()
            .with_tier(Box::new(FailingSource))
            .with_tier(Box::new(EmptySource))
            .with_tier(Box::new(FixedSource(vec![observation("ACME", 42.0)])));

        let prices = source.fetch("ACME", "1d", "1y").await.unwrap();

        assert_eq!(prices.len(), 1);
        assert!((prices[0].close - 42.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn tiered_stops_at_first_non_empty_tier() {
        let source = TieredPriceSource::new()
            .with_tier(Box::new(FixedSource(vec![observation("ACME", 10.0)])))
            .with_tier(Box::new(FixedSource(vec![observation("ACME", 99.0)])));

        let prices = source.fetch("ACME", "1d", "1y").await.unwrap();

        assert_eq!(prices.len(), 1);
        assert!((prices[0].close - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn tiered_exhaustion_is_ok_and_empty() {
        let source = TieredPriceSource::new()
            .with_tier(Box::new(FailingSource))
            .with_tier(Box::new(EmptySource));

        let prices = source.fetch("ACME", "1d", "1y").await.unwrap();

        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn csv_source_filters_by_ticker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        CsvStorage::write_prices(
            &path,
            &[observation("ACME", 10.0), observation("GLOBEX", 20.0)],
        )
        .unwrap();

        let source = CsvPriceSource::new(&path);
        let prices = source.fetch("GLOBEX", "1d", "1y").await.unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].ticker, "GLOBEX");
    }

    #[test]
    fn build_price_source_is_demo_only_without_endpoint() {
        let config = PriceConfig::default();

        let source = build_price_source(&config).unwrap();

        assert_eq!(source.tier_count(), 1);
    }

    #[test]
    fn build_price_source_puts_live_tier_before_demo() {
        let config = PriceConfig {
            endpoint: Some("http://localhost:9000/quotes".to_string()),
            ..PriceConfig::default()
        };

        let source = build_price_source(&config).unwrap();

        assert_eq!(source.tier_count(), 2);
    }
}
