//! Seeded demo data for offline runs.
//!
//! Generates a small synthetic news corpus plus matching random-walk close
//! prices so the whole pipeline can run end to end without network access.
//! Everything is driven by a seeded [`ChaCha8Rng`], so the same seed always
//! produces the same corpus.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sentibar_core::config::AliasEntry;

use crate::models::{Article, PriceObservation};

const SOURCES: [&str; 3] = ["newswire", "marketdesk", "dailybrief"];

/// Deterministic generator for demo articles and prices.
pub struct DemoDataGenerator {
    rng: ChaCha8Rng,
}

impl DemoDataGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generates `per_entity` headlines for each alias entry, spread
    /// uniformly over the `days` before `end`.
    ///
    /// Titles and bodies always mention one of the entity's configured
    /// names, so the generated corpus exercises entity normalization the
    /// same way real headlines would. Duplicate ids (rare template
    /// collisions) are dropped.
    pub fn articles(
        &mut self,
        aliases: &[AliasEntry],
        per_entity: usize,
        days: i64,
        end: DateTime<Utc>,
    ) -> Vec<Article> {
        let span_minutes = (days.max(1)) * 24 * 60;
        let mut articles = Vec::with_capacity(aliases.len() * per_entity);

        for entry in aliases {
            for _ in 0..per_entity {
                let name = &entry.names[self.rng.gen_range(0..entry.names.len())];
                let published_at = end - Duration::minutes(self.rng.gen_range(0..span_minutes));
                let source = SOURCES[self.rng.gen_range(0..SOURCES.len())];
                let pct = self.rng.gen_range(1..=9);
                let (title, body) = self.headline(name, pct, published_at);
                articles.push(Article::new(source, published_at, title, body));
            }
        }

        let mut seen = std::collections::HashSet::new();
        articles.retain(|a| seen.insert(a.id.clone()));
        articles
    }

    /// Generates daily close prices for each alias ticker: a random walk
    /// with slight upward drift, floored at $1.
    pub fn prices(
        &mut self,
        aliases: &[AliasEntry],
        days: i64,
        end: DateTime<Utc>,
    ) -> Vec<PriceObservation> {
        let mut prices = Vec::new();

        for entry in aliases {
            let mut close = 20.0 + self.rng.gen::<f64>() * 60.0;
            for offset in (0..=days).rev() {
                let change = 0.001 + 0.02 * self.standard_normal();
                close = (close * (1.0 + change)).max(1.0);
                let timestamp = end - Duration::days(offset);
                prices.push(PriceObservation::new(&entry.ticker, timestamp, close));
            }
        }

        prices
    }

    fn headline(&mut self, name: &str, pct: u32, published_at: DateTime<Utc>) -> (String, String) {
        let date = published_at.format("%b %d");
        match self.rng.gen_range(0..6) {
            0 => (
                format!("{name} shares climb {pct}% after earnings beat"),
                format!(
                    "{name} reported strong quarterly results that beat analyst estimates. \
                     Management raised full-year guidance on robust demand."
                ),
            ),
            1 => (
                format!("{name} rallies {pct}% on upbeat growth outlook"),
                format!(
                    "Analysts praised {name} for impressive revenue growth and record margins, \
                     calling the outlook excellent."
                ),
            ),
            2 => (
                format!("{name} shares slide {pct}% after regulator opens probe"),
                format!(
                    "{name} is facing a regulatory investigation into its accounting practices. \
                     Investors fear fines and further losses."
                ),
            ),
            3 => (
                format!("{name} falls {pct}% as weak demand hits margins"),
                format!(
                    "Disappointing sales and shrinking margins dragged {name} lower. \
                     Several analysts cut their price targets after the poor report."
                ),
            ),
            4 => (
                format!("{name} holds investor briefing on {date}"),
                format!(
                    "{name} executives presented the company's quarterly operating figures \
                     and answered questions from institutional investors."
                ),
            ),
            _ => (
                format!("{name} announces board changes effective {date}"),
                format!(
                    "{name} said a new independent director will join its board. \
                     The company reiterated its existing guidance."
                ),
            ),
        }
    }

    /// Standard normal draw via Box-Muller over two uniform samples.
    fn standard_normal(&mut self) -> f64 {
        let u1 = self.rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let u2 = self.rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn aliases() -> Vec<AliasEntry> {
        vec![
            AliasEntry {
                ticker: "ACME".to_string(),
                names: vec!["Acme Corp".to_string(), "Acme".to_string()],
            },
            AliasEntry {
                ticker: "GLOBEX".to_string(),
                names: vec!["Globex".to_string()],
            },
        ]
    }

    fn end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap()
    }

    #[test]
    fn same_seed_generates_identical_corpus() {
        let mut a = DemoDataGenerator::new(42);
        let mut b = DemoDataGenerator::new(42);

        let articles_a = a.articles(&aliases(), 5, 30, end());
        let articles_b = b.articles(&aliases(), 5, 30, end());
        assert_eq!(articles_a.len(), articles_b.len());
        for (x, y) in articles_a.iter().zip(&articles_b) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.title, y.title);
            assert_eq!(x.published_at, y.published_at);
        }

        let prices_a = a.prices(&aliases(), 30, end());
        let prices_b = b.prices(&aliases(), 30, end());
        assert_eq!(prices_a.len(), prices_b.len());
        for (x, y) in prices_a.iter().zip(&prices_b) {
            assert!((x.close - y.close).abs() < f64::EPSILON, "walks diverged");
        }
    }

    #[test]
    fn articles_mention_a_configured_name() {
        let mut generator = DemoDataGenerator::new(7);
        let articles = generator.articles(&aliases(), 8, 30, end());

        assert!(!articles.is_empty());
        let names = ["Acme Corp", "Acme", "Globex"];
        for article in &articles {
            assert!(
                names.iter().any(|n| article.title.contains(n)),
                "title missing entity name: {}",
                article.title
            );
        }
    }

    #[test]
    fn article_ids_are_unique() {
        let mut generator = DemoDataGenerator::new(7);
        let articles = generator.articles(&aliases(), 10, 30, end());
        let mut ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), articles.len());
    }

    #[test]
    fn articles_fall_inside_requested_window() {
        let mut generator = DemoDataGenerator::new(11);
        let articles = generator.articles(&aliases(), 6, 14, end());
        let start = end() - Duration::days(14);
        for article in &articles {
            assert!(article.published_at >= start && article.published_at <= end());
        }
    }

    #[test]
    fn prices_cover_every_day_and_stay_above_floor() {
        let mut generator = DemoDataGenerator::new(3);
        let prices = generator.prices(&aliases(), 60, end());

        // 61 observations per ticker, 2 tickers.
        assert_eq!(prices.len(), 122);
        for price in &prices {
            assert!(price.close >= 1.0, "close below floor: {}", price.close);
        }
    }
}
