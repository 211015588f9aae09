//! Flat-file persistence for the batch pipeline.
//!
//! Every table round-trips through serde-typed CSV with a header row, so
//! the files stay loadable independent of this process.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{Reader, Writer};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Article, PriceObservation, SentimentBar, TrainingRow};

pub struct CsvStorage;

impl CsvStorage {
    /// Reads articles from CSV.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or a row fails to parse.
    pub fn read_articles(path: impl AsRef<Path>) -> Result<Vec<Article>> {
        read_rows(path.as_ref())
    }

    /// Writes articles to CSV, sorted by published time.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or writing fails.
    pub fn write_articles(path: impl AsRef<Path>, articles: &[Article]) -> Result<()> {
        let mut sorted = articles.to_vec();
        sorted.sort_by_key(|a| a.published_at);
        write_rows(path.as_ref(), &sorted)
    }

    /// Reads price observations from CSV.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or a row fails to parse.
    pub fn read_prices(path: impl AsRef<Path>) -> Result<Vec<PriceObservation>> {
        read_rows(path.as_ref())
    }

    /// Writes price observations to CSV, sorted by (ticker, timestamp).
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or writing fails.
    pub fn write_prices(path: impl AsRef<Path>, prices: &[PriceObservation]) -> Result<()> {
        let mut sorted = prices.to_vec();
        sorted.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.timestamp.cmp(&b.timestamp)));
        write_rows(path.as_ref(), &sorted)
    }

    /// Reads sentiment bars from CSV.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or a row fails to parse.
    pub fn read_bars(path: impl AsRef<Path>) -> Result<Vec<SentimentBar>> {
        read_rows(path.as_ref())
    }

    /// Writes sentiment bars to CSV, sorted by (ticker, bucket_start).
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or writing fails.
    pub fn write_bars(path: impl AsRef<Path>, bars: &[SentimentBar]) -> Result<()> {
        let mut sorted = bars.to_vec();
        sorted.sort_by(|a, b| {
            a.ticker
                .cmp(&b.ticker)
                .then(a.bucket_start.cmp(&b.bucket_start))
        });
        write_rows(path.as_ref(), &sorted)
    }

    /// Reads the labeled training table from CSV.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or a row fails to parse.
    pub fn read_training(path: impl AsRef<Path>) -> Result<Vec<TrainingRow>> {
        read_rows(path.as_ref())
    }

    /// Writes the labeled training table to CSV, sorted by
    /// (ticker, bucket_start).
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or writing fails.
    pub fn write_training(path: impl AsRef<Path>, rows: &[TrainingRow]) -> Result<()> {
        let mut sorted = rows.to_vec();
        sorted.sort_by(|a, b| {
            a.ticker
                .cmp(&b.ticker)
                .then(a.bucket_start.cmp(&b.bucket_start))
        });
        write_rows(path.as_ref(), &sorted)
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("failed to open CSV file: {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: T =
            record.with_context(|| format!("malformed CSV row in {}", path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create CSV file: {}", path.display()))?;
    let mut writer = Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
