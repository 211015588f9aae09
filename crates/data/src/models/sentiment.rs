//! Sentiment scores and scored ticker mentions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Class probabilities from the sentiment model plus the derived net score.
///
/// `pos + neg + neu` sums to 1 and `score = pos - neg`, so the score sits
/// in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub pos: f64,
    pub neg: f64,
    pub neu: f64,
    pub score: f64,
}

impl SentimentScore {
    /// Builds a score from class probabilities; the net score is derived.
    #[must_use]
    pub fn new(pos: f64, neg: f64, neu: f64) -> Self {
        Self {
            pos,
            neg,
            neu,
            score: pos - neg,
        }
    }

    /// The fixed record for empty or whitespace-only text: fully neutral,
    /// produced without invoking any model.
    #[must_use]
    pub fn blank_text() -> Self {
        Self {
            pos: 0.0,
            neg: 0.0,
            neu: 1.0,
            score: 0.0,
        }
    }
}

/// One (article, ticker) pair after normalization, carrying its sentiment.
///
/// This is the aggregator's input row: an article mentioning N tickers
/// contributes N mentions, one per ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMention {
    pub article_id: String,
    pub ticker: String,
    pub published_at: DateTime<Utc>,
    pub sentiment: SentimentScore,
}

impl ScoredMention {
    #[must_use]
    pub fn new(
        article_id: impl Into<String>,
        ticker: impl Into<String>,
        published_at: DateTime<Utc>,
        sentiment: SentimentScore,
    ) -> Self {
        Self {
            article_id: article_id.into(),
            ticker: ticker.into(),
            published_at,
            sentiment,
        }
    }
}
