//! Remote scoring backend.
//!
//! Sends text batches to an HTTP scoring endpoint (typically a small server
//! wrapping a pretrained transformer) and reads back one probability triple
//! per input. Any transport or shape problem becomes a
//! [`PipelineError::ModelInference`] so the pipeline stage fails loudly
//! instead of emitting placeholder scores.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use sentibar_core::PipelineError;
use sentibar_data::models::SentimentScore;
use serde::{Deserialize, Serialize};

use crate::scorer::SentimentModel;

/// Inference calls are bounded so a stuck server fails the stage.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ScoreRow {
    pos: f64,
    neg: f64,
    neu: f64,
}

/// HTTP scoring backend.
///
/// Expects `POST {endpoint}` with `{"texts": [...]}` to answer with a JSON
/// array of `{pos, neg, neu}` rows, one per input text, in input order.
pub struct RemoteScorer {
    http: Client,
    endpoint: String,
}

impl RemoteScorer {
    /// Creates a scorer against `endpoint` with a bounded request timeout.
    ///
    /// # Errors
    /// Returns [`PipelineError::ModelInference`] when the HTTP client cannot
    /// be constructed.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, PipelineError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::ModelInference(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SentimentModel for RemoteScorer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn score_batch(&self, texts: &[String]) -> Result<Vec<SentimentScore>, PipelineError> {
        tracing::debug!("POST {} ({} texts)", self.endpoint, texts.len());

        let response = self
            .http
            .post(&self.endpoint)
            .json(&ScoreRequest { texts })
            .send()
            .await
            .map_err(|e| PipelineError::ModelInference(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::ModelInference(format!(
                "scoring endpoint returned {status}: {text}"
            )));
        }

        let rows: Vec<ScoreRow> = response
            .json()
            .await
            .map_err(|e| PipelineError::ModelInference(e.to_string()))?;

        if rows.len() != texts.len() {
            return Err(PipelineError::ModelInference(format!(
                "scoring endpoint returned {} rows for {} inputs",
                rows.len(),
                texts.len()
            )));
        }

        Ok(rows
            .into_iter()
            .map(|row| SentimentScore::new(row.pos, row.neg, row.neu))
            .collect())
    }
}
