//! Calibrated probability model for bucketed sentiment features.
//!
//! This crate provides:
//! - An explicit, versioned feature schema and the reindexing feature frame
//! - L2 logistic regression fitted by gradient descent
//! - Isotonic calibration (pool-adjacent-violators)
//! - [`ProbModel`]: cross-validated calibrated members with atomic
//!   JSON persistence

pub mod calibrate;
pub mod frame;
pub mod logistic;
pub mod prob_model;

pub use calibrate::IsotonicRegression;
pub use frame::{FeatureFrame, FeatureSchema};
pub use logistic::{LogisticConfig, LogisticParams, LogisticRegression};
pub use prob_model::{latest_probabilities, ProbModel, TrainReport};
