//! Batch sentiment scoring.
//!
//! [`SentimentModel`] is the seam between the pipeline and whatever actually
//! classifies text (a local lexicon, a remote transformer server). The
//! [`BatchScorer`] wraps a model and enforces the scoring contract: blank
//! text short-circuits to neutral, long text is truncated, inputs are
//! batched for throughput, and output order always matches input order.

use async_trait::async_trait;
use sentibar_core::config::SentimentConfig;
use sentibar_core::PipelineError;
use sentibar_data::models::{Article, SentimentScore};

use crate::lexicon::LexiconScorer;
use crate::remote::RemoteScorer;

/// A text classifier producing (pos, neg, neu) probability triples.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Scores a batch of texts, one result per input, in input order.
    ///
    /// # Errors
    /// Returns [`PipelineError::ModelInference`] when the backend fails.
    async fn score_batch(&self, texts: &[String]) -> Result<Vec<SentimentScore>, PipelineError>;
}

/// Builds the configured scoring backend.
///
/// # Errors
/// Returns [`PipelineError::InvalidConfig`] for an unknown backend name or
/// a remote backend without an endpoint.
pub fn build_model(config: &SentimentConfig) -> Result<Box<dyn SentimentModel>, PipelineError> {
    match config.backend.as_str() {
        "lexicon" => Ok(Box::new(LexiconScorer::new())),
        "remote" => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                PipelineError::InvalidConfig(
                    "sentiment.endpoint is required for the remote backend".to_string(),
                )
            })?;
            Ok(Box::new(RemoteScorer::new(endpoint)?))
        }
        other => Err(PipelineError::InvalidConfig(format!(
            "unknown sentiment backend '{other}'"
        ))),
    }
}

/// Applies the scoring contract around a [`SentimentModel`].
pub struct BatchScorer {
    model: Box<dyn SentimentModel>,
    batch_size: usize,
    max_chars: usize,
}

impl BatchScorer {
    /// Wraps `model` with default batching (16 texts, 512 chars).
    #[must_use]
    pub fn new(model: Box<dyn SentimentModel>) -> Self {
        Self {
            model,
            batch_size: 16,
            max_chars: 512,
        }
    }

    /// Builds the scorer straight from configuration.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidConfig`] when the backend selection
    /// is invalid.
    pub fn from_config(config: &SentimentConfig) -> Result<Self, PipelineError> {
        Ok(Self::new(build_model(config)?)
            .with_batch_size(config.batch_size)
            .with_max_chars(config.max_chars))
    }

    /// Sets how many texts go to the backend per call. Batch size has no
    /// effect on output values or order.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets the truncation limit in characters. Zero disables truncation.
    #[must_use]
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Scores `texts`, returning one record per input in input order.
    ///
    /// Empty or whitespace-only texts map to the neutral (0, 0, 1, 0)
    /// record without touching the backend. Everything else is truncated to
    /// the configured limit and scored in batches.
    ///
    /// # Errors
    /// Returns [`PipelineError::ModelInference`] when the backend fails or
    /// returns a result count that does not match its input.
    pub async fn score_texts(
        &self,
        texts: &[String],
    ) -> Result<Vec<SentimentScore>, PipelineError> {
        let mut results = vec![SentimentScore::blank_text(); texts.len()];

        let pending: Vec<(usize, String)> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| (i, truncate_chars(text, self.max_chars).to_string()))
            .collect();

        for chunk in pending.chunks(self.batch_size) {
            let batch: Vec<String> = chunk.iter().map(|(_, text)| text.clone()).collect();
            let scored = self.model.score_batch(&batch).await?;
            if scored.len() != batch.len() {
                return Err(PipelineError::ModelInference(format!(
                    "backend '{}' returned {} results for {} inputs",
                    self.model.name(),
                    scored.len(),
                    batch.len()
                )));
            }
            for ((index, _), score) in chunk.iter().zip(scored) {
                results[*index] = score;
            }
        }

        Ok(results)
    }

    /// Scores each article's title+body text.
    ///
    /// # Errors
    /// Returns [`PipelineError::ModelInference`] when the backend fails.
    pub async fn score_articles(
        &self,
        articles: &[Article],
    ) -> Result<Vec<SentimentScore>, PipelineError> {
        let texts: Vec<String> = articles.iter().map(Article::search_text).collect();
        self.score_texts(&texts).await
    }
}

/// Truncates to at most `max_chars` characters on a char boundary.
/// A limit of zero means no truncation.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type BatchLog = Arc<Mutex<Vec<Vec<String>>>>;

    /// Backend that records every batch it receives and scores each text by
    /// its length, so order is observable in the output.
    struct RecordingModel {
        batches: BatchLog,
    }

    impl RecordingModel {
        fn new() -> (Self, BatchLog) {
            let batches: BatchLog = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    batches: Arc::clone(&batches),
                },
                batches,
            )
        }
    }

    #[async_trait]
    impl SentimentModel for RecordingModel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn score_batch(
            &self,
            texts: &[String],
        ) -> Result<Vec<SentimentScore>, PipelineError> {
            self.batches.lock().unwrap().push(texts.to_vec());
            Ok(texts
                .iter()
                .map(|t| {
                    let p = (t.chars().count() as f64 / 100.0).min(1.0);
                    SentimentScore::new(p, 0.0, 1.0 - p)
                })
                .collect())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl SentimentModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn score_batch(
            &self,
            _texts: &[String],
        ) -> Result<Vec<SentimentScore>, PipelineError> {
            Err(PipelineError::ModelInference("backend down".to_string()))
        }
    }

    struct ShortModel;

    #[async_trait]
    impl SentimentModel for ShortModel {
        fn name(&self) -> &str {
            "short"
        }

        async fn score_batch(
            &self,
            _texts: &[String],
        ) -> Result<Vec<SentimentScore>, PipelineError> {
            Ok(vec![SentimentScore::blank_text()])
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn blank_texts_map_to_neutral_without_backend_call() {
        let scorer = BatchScorer::new(Box::new(FailingModel));
        let scores = scorer.score_texts(&strings(&["", "   ", "\t\n"])).await.unwrap();

        assert_eq!(scores.len(), 3);
        for score in scores {
            assert!((score.neu - 1.0).abs() < f64::EPSILON);
            assert!(score.score.abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn output_order_matches_input_with_blanks_interleaved() {
        let (model, _) = RecordingModel::new();
        let scorer = BatchScorer::new(Box::new(model)).with_batch_size(2);
        let texts = strings(&["aaaa", "", "aaaaaaaa", "  ", "aa"]);
        let scores = scorer.score_texts(&texts).await.unwrap();

        assert_eq!(scores.len(), 5);
        // Length-derived pos values land back at their original positions.
        assert!((scores[0].pos - 0.04).abs() < 1e-12);
        assert!((scores[1].neu - 1.0).abs() < f64::EPSILON);
        assert!((scores[2].pos - 0.08).abs() < 1e-12);
        assert!((scores[3].neu - 1.0).abs() < f64::EPSILON);
        assert!((scores[4].pos - 0.02).abs() < 1e-12);
    }

    #[tokio::test]
    async fn batch_size_controls_backend_call_shape_not_output() {
        let texts = strings(&["a", "bb", "ccc", "dddd", "eeeee"]);

        let (chunked_model, chunked_log) = RecordingModel::new();
        let scorer = BatchScorer::new(Box::new(chunked_model)).with_batch_size(2);
        let chunked = scorer.score_texts(&texts).await.unwrap();
        assert_eq!(chunked_log.lock().unwrap().len(), 3, "5 texts in batches of 2");

        let (single_model, single_log) = RecordingModel::new();
        let scorer_one = BatchScorer::new(Box::new(single_model)).with_batch_size(100);
        let single = scorer_one.score_texts(&texts).await.unwrap();
        assert_eq!(single_log.lock().unwrap().len(), 1);

        for (a, b) in chunked.iter().zip(&single) {
            assert!((a.pos - b.pos).abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn long_text_is_truncated_before_scoring() {
        let (model, batches) = RecordingModel::new();
        let scorer = BatchScorer::new(Box::new(model)).with_max_chars(5);
        scorer
            .score_texts(&strings(&["abcdefghij"]))
            .await
            .unwrap();

        let seen = batches.lock().unwrap();
        assert_eq!(seen[0][0], "abcde");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 6), "héllo ");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("anything", 0), "anything");
    }

    #[tokio::test]
    async fn backend_failure_propagates_for_non_blank_text() {
        let scorer = BatchScorer::new(Box::new(FailingModel));
        let err = scorer
            .score_texts(&strings(&["real headline"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelInference(_)));
    }

    #[tokio::test]
    async fn length_mismatch_from_backend_is_an_error() {
        let scorer = BatchScorer::new(Box::new(ShortModel));
        let err = scorer
            .score_texts(&strings(&["one", "two"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelInference(_)));
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let scorer = BatchScorer::new(Box::new(FailingModel));
        let scores = scorer.score_texts(&[]).await.unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn build_model_rejects_unknown_backend() {
        let config = SentimentConfig {
            backend: "quantum".to_string(),
            ..SentimentConfig::default()
        };
        assert!(matches!(
            build_model(&config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn build_model_remote_requires_endpoint() {
        let config = SentimentConfig {
            backend: "remote".to_string(),
            endpoint: None,
            ..SentimentConfig::default()
        };
        assert!(matches!(
            build_model(&config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
