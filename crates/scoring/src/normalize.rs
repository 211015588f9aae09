//! Entity-to-ticker normalization.
//!
//! Headlines talk about companies by name; bars are keyed by ticker. The
//! [`EntityNormalizer`] scans each article's title and body for configured
//! alias names and explodes the article into one [`ScoredMention`] per
//! matched ticker. Articles that arrive pre-tagged with a ticker keep that
//! tag and skip the scan.

use regex::Regex;
use sentibar_core::config::AliasEntry;
use sentibar_core::PipelineError;
use sentibar_data::models::{Article, ScoredMention, SentimentScore};

/// An insertion-ordered map from ticker to the names that identify it.
///
/// Insertion order is load-bearing: when one article mentions several
/// tickers, the resulting mentions come out in this order, which keeps
/// repeated runs over the same alias set deterministic.
#[derive(Debug, Clone, Default)]
pub struct TickerAliasSet {
    entries: Vec<AliasEntry>,
}

impl TickerAliasSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builds the set from configuration entries, preserving their order.
    #[must_use]
    pub fn from_entries(entries: &[AliasEntry]) -> Self {
        let mut set = Self::new();
        for entry in entries {
            set.insert(&entry.ticker, entry.names.iter().map(String::as_str));
        }
        set
    }

    /// Adds a ticker with its searchable names. Re-inserting an existing
    /// ticker extends its name list instead of reordering it.
    pub fn insert<I, S>(&mut self, ticker: impl Into<String>, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ticker = ticker.into();
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.ticker == ticker) {
            entry.names.extend(names);
        } else {
            self.entries.push(AliasEntry { ticker, names });
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.ticker.as_str())
    }
}

/// Matches articles to tickers by case-insensitive alias search.
pub struct EntityNormalizer {
    matchers: Vec<(String, Regex)>,
}

impl EntityNormalizer {
    /// Compiles one matcher per ticker from its escaped alias names.
    /// Tickers with no usable names are skipped with a warning.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidConfig`] if a compiled alias pattern
    /// is rejected by the regex engine.
    pub fn new(aliases: &TickerAliasSet) -> Result<Self, PipelineError> {
        let mut matchers = Vec::with_capacity(aliases.len());
        for entry in aliases.entries() {
            let escaped: Vec<String> = entry
                .names
                .iter()
                .filter(|name| !name.trim().is_empty())
                .map(|name| regex::escape(name))
                .collect();
            if escaped.is_empty() {
                tracing::warn!("Ticker {} has no searchable names, skipping", entry.ticker);
                continue;
            }
            let pattern = format!("(?i){}", escaped.join("|"));
            let regex = Regex::new(&pattern).map_err(|e| {
                PipelineError::InvalidConfig(format!(
                    "alias pattern for {} failed to compile: {e}",
                    entry.ticker
                ))
            })?;
            matchers.push((entry.ticker.clone(), regex));
        }
        Ok(Self { matchers })
    }

    /// Returns the tickers whose aliases appear in `text`, in alias
    /// insertion order.
    #[must_use]
    pub fn match_tickers(&self, text: &str) -> Vec<&str> {
        self.matchers
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(ticker, _)| ticker.as_str())
            .collect()
    }

    /// Explodes scored articles into one mention per (article, ticker).
    ///
    /// `scores` must be aligned with `articles` (one score per article, as
    /// produced by the batch scorer). A pre-tagged article yields exactly
    /// its own ticker; untagged articles are scanned, and articles matching
    /// nothing are dropped.
    #[must_use]
    pub fn explode(&self, articles: &[Article], scores: &[SentimentScore]) -> Vec<ScoredMention> {
        let mut mentions = Vec::new();
        for (article, score) in articles.iter().zip(scores) {
            if let Some(ticker) = &article.ticker {
                mentions.push(ScoredMention::new(
                    &article.id,
                    ticker,
                    article.published_at,
                    *score,
                ));
                continue;
            }
            let text = article.search_text();
            for ticker in self.match_tickers(&text) {
                mentions.push(ScoredMention::new(
                    &article.id,
                    ticker,
                    article.published_at,
                    *score,
                ));
            }
        }
        mentions
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn alias_set() -> TickerAliasSet {
        let mut set = TickerAliasSet::new();
        set.insert("ACME", ["Acme Corp", "Acme"]);
        set.insert("GLOBEX", ["Globex"]);
        set.insert("INITECH", ["Initech"]);
        set
    }

    fn article(title: &str, body: &str) -> Article {
        Article::new(
            "wire",
            Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap(),
            title,
            body,
        )
    }

    fn neutral() -> SentimentScore {
        SentimentScore::blank_text()
    }

    #[test]
    fn matching_is_case_insensitive() {
        let normalizer = EntityNormalizer::new(&alias_set()).unwrap();
        assert_eq!(normalizer.match_tickers("ACME CORP beats estimates"), ["ACME"]);
        assert_eq!(normalizer.match_tickers("quiet day for globex"), ["GLOBEX"]);
    }

    #[test]
    fn multi_ticker_article_explodes_in_insertion_order() {
        let normalizer = EntityNormalizer::new(&alias_set()).unwrap();
        let articles = vec![article(
            "Initech and Acme announce merger talks",
            "Shares of both companies moved on the report.",
        )];
        let mentions = normalizer.explode(&articles, &[neutral()]);

        let tickers: Vec<&str> = mentions.iter().map(|m| m.ticker.as_str()).collect();
        assert_eq!(tickers, ["ACME", "INITECH"]);
        assert_eq!(mentions[0].article_id, articles[0].id);
    }

    #[test]
    fn unmatched_articles_are_dropped_not_errored() {
        let normalizer = EntityNormalizer::new(&alias_set()).unwrap();
        let articles = vec![article("Bond yields drift lower", "No companies named.")];
        let mentions = normalizer.explode(&articles, &[neutral()]);
        assert!(mentions.is_empty());
    }

    #[test]
    fn body_mentions_count_not_just_title() {
        let normalizer = EntityNormalizer::new(&alias_set()).unwrap();
        let articles = vec![article(
            "Sector roundup",
            "Analysts stayed cautious on Globex after earnings.",
        )];
        let mentions = normalizer.explode(&articles, &[neutral()]);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].ticker, "GLOBEX");
    }

    #[test]
    fn pre_tagged_article_keeps_its_tag_and_skips_scan() {
        let normalizer = EntityNormalizer::new(&alias_set()).unwrap();
        let articles =
            vec![article("Acme expands into new markets", "Positive coverage.")
                .with_ticker("GLOBEX")];
        let mentions = normalizer.explode(&articles, &[neutral()]);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].ticker, "GLOBEX");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let normalizer = EntityNormalizer::new(&alias_set()).unwrap();
        assert!(normalizer.explode(&[], &[]).is_empty());
    }

    #[test]
    fn alias_names_are_treated_literally() {
        let mut set = TickerAliasSet::new();
        set.insert("DOT", ["A.B. Holdings"]);
        let normalizer = EntityNormalizer::new(&set).unwrap();

        // The dot must not act as a regex wildcard.
        assert!(normalizer.match_tickers("AxB Holdings raises capital").is_empty());
        assert_eq!(normalizer.match_tickers("A.B. Holdings raises capital"), ["DOT"]);
    }

    #[test]
    fn reinserting_a_ticker_extends_names_in_place() {
        let mut set = alias_set();
        set.insert("ACME", ["Acme Industries"]);
        assert_eq!(set.len(), 3);

        let normalizer = EntityNormalizer::new(&set).unwrap();
        assert_eq!(
            normalizer.match_tickers("Acme Industries files annual report"),
            ["ACME"]
        );
    }

    #[test]
    fn blank_names_are_skipped() {
        let mut set = TickerAliasSet::new();
        set.insert("EMPTY", ["", "  "]);
        set.insert("ACME", ["Acme"]);
        let normalizer = EntityNormalizer::new(&set).unwrap();

        // A blank alias must not match every article.
        assert_eq!(normalizer.match_tickers("Acme update"), ["ACME"]);
    }
}
