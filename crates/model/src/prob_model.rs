//! The calibrated probability model.
//!
//! Training follows the cross-validated calibration recipe: the data is
//! split into stratified folds, each fold trains a logistic base model on
//! the other folds and fits an isotonic calibrator on its own held-out
//! slice, and prediction averages the calibrated outputs of all members.
//! A training window containing a single label class degenerates to a
//! constant-prior model instead of failing, so walk-forward folds over
//! one-sided data still evaluate.
//!
//! The persisted artifact carries the feature schema alongside the fitted
//! parameters; predictions reindex every incoming table against that
//! schema, which makes `predict_proba` invariant to column order and to
//! extra columns in the caller's table.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::{Array1, Axis};
use sentibar_core::config::ModelConfig;
use sentibar_core::PipelineError;
use sentibar_data::models::{SentimentBar, TrainingRow};
use sentibar_data::CsvStorage;
use serde::{Deserialize, Serialize};

use crate::calibrate::IsotonicRegression;
use crate::frame::{FeatureFrame, FeatureSchema};
use crate::logistic::{LogisticConfig, LogisticParams, LogisticRegression};

/// One cross-validation member: a base classifier plus the calibrator
/// fitted on its held-out fold.
#[derive(Debug)]
struct Member {
    base: LogisticRegression,
    calibrator: IsotonicRegression,
}

/// Calibrated binary classifier with a fixed feature schema.
#[derive(Debug)]
pub struct ProbModel {
    schema: FeatureSchema,
    members: Vec<Member>,
    /// Training base rate; the prediction when no members could be fit.
    prior: f64,
    trained_at: DateTime<Utc>,
    n_samples: usize,
}

#[derive(Serialize, Deserialize)]
struct MemberArtifact {
    base: LogisticParams,
    calibrator: IsotonicRegression,
}

/// On-disk form of a [`ProbModel`].
#[derive(Serialize, Deserialize)]
struct ProbModelArtifact {
    schema: FeatureSchema,
    members: Vec<MemberArtifact>,
    prior: f64,
    trained_at: DateTime<Utc>,
    n_samples: usize,
}

/// Summary of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub n_samples: usize,
    pub n_positive: usize,
    pub members: usize,
    pub model_path: PathBuf,
}

impl ProbModel {
    /// Fits a calibrated model on the frame and its labels.
    ///
    /// # Errors
    /// Returns [`PipelineError::InsufficientData`] for an empty table and
    /// [`PipelineError::ModelInference`] when rows and labels disagree.
    pub fn fit(frame: &FeatureFrame, y: &[u8], cv_folds: usize) -> Result<Self, PipelineError> {
        if frame.nrows() == 0 || y.is_empty() {
            return Err(PipelineError::InsufficientData(
                "cannot fit a model on an empty training table".to_string(),
            ));
        }
        if frame.nrows() != y.len() {
            return Err(PipelineError::ModelInference(format!(
                "feature table has {} rows but {} labels",
                frame.nrows(),
                y.len()
            )));
        }

        let cv_folds = cv_folds.max(2);
        let schema = FeatureSchema::v1();
        let matrix = frame.to_matrix(&schema);
        let n_positive = y.iter().filter(|&&label| label == 1).count();
        let prior = n_positive as f64 / y.len() as f64;

        if n_positive == 0 || n_positive == y.len() {
            tracing::warn!(
                "Training labels contain a single class, fitting constant-prior model ({:.3})",
                prior
            );
            return Ok(Self {
                schema,
                members: Vec::new(),
                prior,
                trained_at: Utc::now(),
                n_samples: y.len(),
            });
        }

        let folds = stratified_folds(y, cv_folds);
        let mut members = Vec::with_capacity(cv_folds);
        for fold in 0..cv_folds {
            let train_idx: Vec<usize> = (0..y.len()).filter(|i| folds[*i] != fold).collect();
            let eval_idx: Vec<usize> = (0..y.len()).filter(|i| folds[*i] == fold).collect();
            if train_idx.is_empty() || eval_idx.is_empty() {
                continue;
            }
            let y_train: Vec<f64> = train_idx.iter().map(|&i| f64::from(y[i])).collect();
            let train_positives = y_train.iter().filter(|&&v| v > 0.5).count();
            if train_positives == 0 || train_positives == y_train.len() {
                continue;
            }

            let x_train = matrix.select(Axis(0), &train_idx);
            let base =
                LogisticRegression::fit(&x_train, &Array1::from_vec(y_train), &LogisticConfig::default());

            let x_eval = matrix.select(Axis(0), &eval_idx);
            let raw_eval = base.predict_proba(&x_eval).to_vec();
            let y_eval: Vec<f64> = eval_idx.iter().map(|&i| f64::from(y[i])).collect();
            let calibrator = IsotonicRegression::fit(&raw_eval, &y_eval);

            members.push(Member { base, calibrator });
        }

        if members.is_empty() {
            tracing::warn!("All calibration folds degenerated, fitting constant-prior model");
        }

        Ok(Self {
            schema,
            members,
            prior,
            trained_at: Utc::now(),
            n_samples: y.len(),
        })
    }

    /// P(y = 1) per row, averaged across calibrated members.
    ///
    /// The frame is reindexed against the training-time schema first, so
    /// column order, extra columns, missing columns, and NaN cells in the
    /// caller's table cannot change the result relative to the canonical
    /// layout.
    #[must_use]
    pub fn predict_proba(&self, frame: &FeatureFrame) -> Vec<f64> {
        let matrix = frame.to_matrix(&self.schema);
        if self.members.is_empty() {
            return vec![self.prior; matrix.nrows()];
        }

        let mut sums = vec![0.0; matrix.nrows()];
        for member in &self.members {
            let raw = member.base.predict_proba(&matrix);
            for (slot, score) in sums.iter_mut().zip(raw.iter()) {
                *slot += member.calibrator.transform(*score);
            }
        }
        let k = self.members.len() as f64;
        sums.into_iter().map(|s| (s / k).clamp(0.0, 1.0)).collect()
    }

    /// Hard labels at the 0.5 probability threshold.
    #[must_use]
    pub fn predict(&self, frame: &FeatureFrame) -> Vec<u8> {
        self.predict_proba(frame)
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect()
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    #[must_use]
    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// True when the model predicts the training base rate for every row.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.members.is_empty()
    }

    /// Serializes the model next to `path` and atomically renames it into
    /// place, so concurrent readers never observe a half-written artifact.
    ///
    /// # Errors
    /// Returns [`PipelineError::Storage`] on I/O failure and
    /// [`PipelineError::ModelArtifact`] if serialization itself fails.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let artifact = ProbModelArtifact {
            schema: self.schema.clone(),
            members: self
                .members
                .iter()
                .map(|m| MemberArtifact {
                    base: m.base.params(),
                    calibrator: m.calibrator.clone(),
                })
                .collect(),
            prior: self.prior,
            trained_at: self.trained_at,
            n_samples: self.n_samples,
        };
        let json = serde_json::to_string_pretty(&artifact)
            .map_err(|e| PipelineError::ModelArtifact(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Loads a persisted model.
    ///
    /// # Errors
    /// Returns [`PipelineError::ModelArtifact`] when the artifact is
    /// missing or corrupted; there is no silent untrained fallback.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            PipelineError::ModelArtifact(format!(
                "model artifact unavailable at {}: {e}",
                path.display()
            ))
        })?;
        let artifact: ProbModelArtifact = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::ModelArtifact(format!(
                "model artifact corrupted at {}: {e}",
                path.display()
            ))
        })?;

        Ok(Self {
            schema: artifact.schema,
            members: artifact
                .members
                .into_iter()
                .map(|m| Member {
                    base: LogisticRegression::from_params(m.base),
                    calibrator: m.calibrator,
                })
                .collect(),
            prior: artifact.prior,
            trained_at: artifact.trained_at,
            n_samples: artifact.n_samples,
        })
    }

    /// Trains from a labeled CSV table and persists the artifact.
    ///
    /// # Errors
    /// Returns [`PipelineError::Storage`] when the table cannot be read,
    /// [`PipelineError::InsufficientData`] when it is smaller than the
    /// configured minimum, and any error from [`ProbModel::fit`] or
    /// [`ProbModel::save`].
    pub fn train_and_save(
        dataset_path: &Path,
        model_path: &Path,
        config: &ModelConfig,
    ) -> Result<TrainReport, PipelineError> {
        let rows = CsvStorage::read_training(dataset_path)
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        Self::train_rows_and_save(&rows, model_path, config)
    }

    /// Trains from in-memory rows and persists the artifact.
    ///
    /// # Errors
    /// Same contract as [`ProbModel::train_and_save`], minus the read step.
    pub fn train_rows_and_save(
        rows: &[TrainingRow],
        model_path: &Path,
        config: &ModelConfig,
    ) -> Result<TrainReport, PipelineError> {
        if rows.len() < config.min_train_samples {
            return Err(PipelineError::InsufficientData(format!(
                "training table has {} rows, need at least {}",
                rows.len(),
                config.min_train_samples
            )));
        }

        let frame = FeatureFrame::from_training_rows(rows);
        let y: Vec<u8> = rows.iter().map(|r| r.y).collect();
        let n_positive = y.iter().filter(|&&label| label == 1).count();

        let model = Self::fit(&frame, &y, config.cv_folds)?;
        model.save(model_path)?;

        tracing::info!(
            "Trained model on {} rows ({} positive), {} members, saved to {}",
            rows.len(),
            n_positive,
            model.members.len(),
            model_path.display()
        );

        Ok(TrainReport {
            n_samples: rows.len(),
            n_positive,
            members: model.members.len(),
            model_path: model_path.to_path_buf(),
        })
    }
}

/// Deterministic stratified fold assignment: within each class, rows are
/// dealt round-robin across folds, so every fold sees both classes whenever
/// the class counts allow it.
fn stratified_folds(y: &[u8], k: usize) -> Vec<usize> {
    let mut folds = vec![0usize; y.len()];
    let mut seen = [0usize; 2];
    for (i, label) in y.iter().enumerate() {
        let class = usize::from(*label == 1);
        folds[i] = seen[class] % k;
        seen[class] += 1;
    }
    folds
}

/// Calibrated up-move probability for the newest bar of each ticker.
///
/// The API and the alert sweep both go through this, so they always agree
/// on which bucket a served probability refers to.
#[must_use]
pub fn latest_probabilities(model: &ProbModel, bars: &[SentimentBar]) -> HashMap<String, f64> {
    let mut latest: HashMap<&str, &SentimentBar> = HashMap::new();
    for bar in bars {
        let slot = latest.entry(bar.ticker.as_str()).or_insert(bar);
        if bar.bucket_start > slot.bucket_start {
            *slot = bar;
        }
    }
    latest
        .into_iter()
        .filter_map(|(ticker, bar)| {
            let frame = FeatureFrame::from_bars(std::slice::from_ref(bar));
            model
                .predict_proba(&frame)
                .first()
                .copied()
                .map(|p| (ticker.to_string(), p))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
