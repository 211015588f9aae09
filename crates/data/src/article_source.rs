//! Article sources for the ingestion stage.
//!
//! An [`ArticleSource`] yields raw articles from somewhere external (a CSV
//! dump, an RSS mirror, a vendor API). Sources normalize their failures to
//! [`PipelineError::SourceUnavailable`] so the caller can decide whether to
//! halt or fall back.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sentibar_core::PipelineError;

use crate::csv_storage::CsvStorage;
use crate::models::Article;

/// A provider of raw articles.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Fetches all currently available articles.
    ///
    /// Returned articles are deduplicated by id and already filtered to the
    /// source's own quality rules. An empty vector is a valid result.
    ///
    /// # Errors
    /// Returns [`PipelineError::SourceUnavailable`] when the backing store
    /// cannot be reached or parsed.
    async fn fetch(&self) -> Result<Vec<Article>, PipelineError>;
}

/// Reads articles from a local CSV file.
///
/// This is the offline ingestion path: a pre-assembled dump with the same
/// columns the [`CsvStorage`] writer produces. Rows shorter than `min_chars`
/// (title plus body) are dropped, and duplicate ids keep their first
/// occurrence.
pub struct CsvArticleSource {
    path: PathBuf,
    min_chars: usize,
}

impl CsvArticleSource {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            min_chars: 0,
        }
    }

    /// Sets the minimum combined title+body length an article must have.
    #[must_use]
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }
}

#[async_trait]
impl ArticleSource for CsvArticleSource {
    fn name(&self) -> &str {
        "articles-csv"
    }

    async fn fetch(&self) -> Result<Vec<Article>, PipelineError> {
        let rows = CsvStorage::read_articles(&self.path)
            .map_err(|e| PipelineError::source_unavailable("articles-csv", e.to_string()))?;

        let mut seen = HashSet::new();
        let kept: Vec<Article> = rows
            .into_iter()
            .filter(|article| article.content_chars() >= self.min_chars)
            .filter(|article| seen.insert(article.id.clone()))
            .collect();

        tracing::debug!(
            "Loaded {} articles from {} (min_chars={})",
            kept.len(),
            self.path.display(),
            self.min_chars
        );
        Ok(kept)
    }
}

// ============================================================================
// Tests
// ============================================================================
