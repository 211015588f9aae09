//! Offline lexicon scoring backend.
//!
//! Uses the VADER (Valence Aware Dictionary and sEntiment Reasoner)
//! algorithm, which is tuned for short news and social-media text and needs
//! no model server. `polarity_scores` already returns pos/neg/neu as
//! proportions summing to one, which maps directly onto [`SentimentScore`].

use async_trait::async_trait;
use sentibar_core::PipelineError;
use sentibar_data::models::SentimentScore;
use vader_sentiment::SentimentIntensityAnalyzer;

use crate::scorer::SentimentModel;

/// VADER-backed sentiment backend.
pub struct LexiconScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl LexiconScorer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    fn score_one(&self, text: &str) -> SentimentScore {
        let scores = self.analyzer.polarity_scores(text);
        let pos = scores.get("pos").copied().unwrap_or(0.0);
        let neg = scores.get("neg").copied().unwrap_or(0.0);
        let neu = scores.get("neu").copied().unwrap_or(0.0);
        SentimentScore::new(pos, neg, neu)
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentModel for LexiconScorer {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn score_batch(&self, texts: &[String]) -> Result<Vec<SentimentScore>, PipelineError> {
        Ok(texts.iter().map(|text| self.score_one(text)).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upbeat_headline_scores_positive() {
        let scorer = LexiconScorer::new();
        let scores = scorer
            .score_batch(&["Company reports excellent record profits, strong growth".to_string()])
            .await
            .unwrap();
        assert!(scores[0].score > 0.0, "score was {}", scores[0].score);
    }

    #[tokio::test]
    async fn grim_headline_scores_negative() {
        let scorer = LexiconScorer::new();
        let scores = scorer
            .score_batch(&["Company collapses amid fraud lawsuit and devastating losses".to_string()])
            .await
            .unwrap();
        assert!(scores[0].score < 0.0, "score was {}", scores[0].score);
    }

    #[tokio::test]
    async fn proportions_stay_in_unit_range() {
        let scorer = LexiconScorer::new();
        let scores = scorer
            .score_batch(&["Quarterly report published on schedule".to_string()])
            .await
            .unwrap();
        let s = scores[0];
        for part in [s.pos, s.neg, s.neu] {
            assert!((0.0..=1.0).contains(&part));
        }
        assert!((s.pos + s.neg + s.neu - 1.0).abs() < 1e-6);
    }
}
