//! Feature schema and the named-column table fed to the model.
//!
//! The schema is an explicit, versioned allow-list of feature columns. The
//! model never selects columns by name pattern; it reindexes the incoming
//! table to the schema's exact order, filling anything missing with zero
//! and ignoring anything extra. Feature order is load-bearing for the
//! underlying classifier, so that reindex step is what keeps predictions
//! stable across callers that assemble their tables differently.

use ndarray::Array2;
use sentibar_core::PipelineError;
use sentibar_data::models::{SentimentBar, TrainingRow};
use serde::{Deserialize, Serialize};

/// Ordered, versioned list of feature column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    version: u32,
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Schema version 1: the seven sentiment-bar statistics.
    #[must_use]
    pub fn v1() -> Self {
        Self {
            version: 1,
            columns: [
                "mean_sent",
                "std_sent",
                "min_sent",
                "max_sent",
                "count",
                "unc_mean",
                "time_decay_mean",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::v1()
    }
}

/// A numeric table with named columns of equal length.
#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    columns: Vec<(String, Vec<f64>)>,
    nrows: usize,
}

impl FeatureFrame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named column. The first column fixes the row count.
    ///
    /// # Errors
    /// Returns [`PipelineError::ModelInference`] when the column length does
    /// not match the frame.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), PipelineError> {
        let name = name.into();
        if self.columns.is_empty() {
            self.nrows = values.len();
        } else if values.len() != self.nrows {
            return Err(PipelineError::ModelInference(format!(
                "column '{}' has {} rows, frame has {}",
                name,
                values.len(),
                self.nrows
            )));
        }
        self.columns.push((name, values));
        Ok(())
    }

    /// Builds the canonical frame from labeled training rows.
    #[must_use]
    pub fn from_training_rows(rows: &[TrainingRow]) -> Self {
        Self {
            nrows: rows.len(),
            columns: vec![
                ("mean_sent".to_string(), rows.iter().map(|r| r.mean_sent).collect()),
                ("std_sent".to_string(), rows.iter().map(|r| r.std_sent).collect()),
                ("min_sent".to_string(), rows.iter().map(|r| r.min_sent).collect()),
                ("max_sent".to_string(), rows.iter().map(|r| r.max_sent).collect()),
                ("count".to_string(), rows.iter().map(|r| r.count as f64).collect()),
                ("unc_mean".to_string(), rows.iter().map(|r| r.unc_mean).collect()),
                (
                    "time_decay_mean".to_string(),
                    rows.iter().map(|r| r.time_decay_mean).collect(),
                ),
            ],
        }
    }

    /// Builds the canonical frame from sentiment bars (the serving path).
    #[must_use]
    pub fn from_bars(bars: &[SentimentBar]) -> Self {
        Self {
            nrows: bars.len(),
            columns: vec![
                ("mean_sent".to_string(), bars.iter().map(|b| b.mean_sent).collect()),
                ("std_sent".to_string(), bars.iter().map(|b| b.std_sent).collect()),
                ("min_sent".to_string(), bars.iter().map(|b| b.min_sent).collect()),
                ("max_sent".to_string(), bars.iter().map(|b| b.max_sent).collect()),
                ("count".to_string(), bars.iter().map(|b| b.count as f64).collect()),
                ("unc_mean".to_string(), bars.iter().map(|b| b.unc_mean).collect()),
                (
                    "time_decay_mean".to_string(),
                    bars.iter().map(|b| b.time_decay_mean).collect(),
                ),
            ],
        }
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Reindexes the frame to the schema's column order.
    ///
    /// Schema columns absent from the frame come out as zeros, frame
    /// columns absent from the schema are ignored, and NaN cells are
    /// replaced with zero. The result is safe to feed to an order-sensitive
    /// classifier regardless of how the caller assembled the frame.
    #[must_use]
    pub fn to_matrix(&self, schema: &FeatureSchema) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((self.nrows, schema.len()));
        for (j, name) in schema.columns().iter().enumerate() {
            if let Some(values) = self.column(name) {
                for (i, value) in values.iter().enumerate() {
                    matrix[[i, j]] = if value.is_finite() { *value } else { 0.0 };
                }
            }
        }
        matrix
    }
}

// ============================================================================
// Tests
// ============================================================================
