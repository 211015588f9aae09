//! Data storage and acquisition for the sentiment signal pipeline.
//!
//! This crate provides:
//! - Article and price sources with tiered fallback
//! - Data models for articles, sentiment bars, prices, and training rows
//! - CSV storage for every pipeline artifact
//! - `PostgreSQL` repositories for typed database access
//! - A seeded demo data generator for offline runs

pub mod article_source;
pub mod csv_storage;
pub mod database;
pub mod demo;
pub mod models;
pub mod price_source;
pub mod repositories;

// Re-export commonly used types
pub use article_source::{ArticleSource, CsvArticleSource};
pub use csv_storage::CsvStorage;
pub use database::Database;
pub use demo::DemoDataGenerator;
pub use price_source::{
    build_price_source, CsvPriceSource, HttpPriceSource, PriceSource, TieredPriceSource,
};

// Re-export models
pub use models::{
    content_id, Article, PriceObservation, ScoredMention, SentimentBar, SentimentScore,
    TrainingRow,
};

// Re-export repositories
pub use repositories::{
    AlertHistoryRecord, AlertHistoryRepository, ArticleRepository, BarRepository, PriceRepository,
};
