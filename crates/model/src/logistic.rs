//! L2-regularized logistic regression fitted by gradient descent.
//!
//! Features are standardized internally (mean 0, unit variance) before the
//! descent, and the scaling parameters travel with the fitted model so
//! serving applies the same transform. A model only exists in fitted form;
//! there is no unfitted state to guard against.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Gradient-descent settings.
#[derive(Debug, Clone)]
pub struct LogisticConfig {
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Stop when the log-loss improvement drops below this.
    pub tolerance: f64,
    /// L2 penalty strength.
    pub l2: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 500,
            tolerance: 1e-7,
            l2: 1e-4,
        }
    }
}

/// Serializable parameters of a fitted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticParams {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub feature_mean: Vec<f64>,
    pub feature_std: Vec<f64>,
}

/// A fitted binary logistic regression.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    weights: Array1<f64>,
    bias: f64,
    feature_mean: Array1<f64>,
    feature_std: Array1<f64>,
}

impl LogisticRegression {
    /// Fits by batch gradient descent on standardized features.
    ///
    /// `y` holds 0.0/1.0 targets, one per row of `x`.
    #[must_use]
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, config: &LogisticConfig) -> Self {
        let n_samples = x.nrows().max(1) as f64;
        let n_features = x.ncols();

        let (feature_mean, feature_std) = standardization_params(x);
        let x_std = standardize(x, &feature_mean, &feature_std);

        let mut weights = Array1::<f64>::zeros(n_features);
        let mut bias = 0.0;
        let mut prev_cost = f64::INFINITY;

        for iter in 0..config.max_iter {
            let linear = x_std.dot(&weights) + bias;
            let predictions = linear.mapv(sigmoid);

            let errors = &predictions - y;
            let dw = x_std.t().dot(&errors) / n_samples + &(&weights * config.l2);
            let db = errors.sum() / n_samples;

            weights = &weights - &(&dw * config.learning_rate);
            bias -= config.learning_rate * db;

            let cost = log_loss(y, &predictions);
            if (prev_cost - cost).abs() < config.tolerance {
                tracing::trace!("Gradient descent converged at iteration {}", iter);
                break;
            }
            prev_cost = cost;
        }

        Self {
            weights,
            bias,
            feature_mean,
            feature_std,
        }
    }

    /// Sigmoid of the decision function, per row.
    #[must_use]
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let x_std = standardize(x, &self.feature_mean, &self.feature_std);
        (x_std.dot(&self.weights) + self.bias).mapv(sigmoid)
    }

    #[must_use]
    pub fn params(&self) -> LogisticParams {
        LogisticParams {
            weights: self.weights.to_vec(),
            bias: self.bias,
            feature_mean: self.feature_mean.to_vec(),
            feature_std: self.feature_std.to_vec(),
        }
    }

    #[must_use]
    pub fn from_params(params: LogisticParams) -> Self {
        Self {
            weights: Array1::from_vec(params.weights),
            bias: params.bias,
            feature_mean: Array1::from_vec(params.feature_mean),
            feature_std: Array1::from_vec(params.feature_std),
        }
    }
}

/// Numerically stable sigmoid.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}

fn log_loss(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let eps = 1e-15;
    let n = y_true.len().max(1) as f64;
    -y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&y, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            y * p.ln() + (1.0 - y) * (1.0 - p).ln()
        })
        .sum::<f64>()
        / n
}

/// Per-column mean and standard deviation; constant columns get std 1 so
/// standardization leaves them at zero instead of dividing by zero.
fn standardization_params(x: &Array2<f64>) -> (Array1<f64>, Array1<f64>) {
    let n = x.nrows().max(1) as f64;
    let mut mean = Array1::<f64>::zeros(x.ncols());
    let mut std = Array1::<f64>::zeros(x.ncols());

    for j in 0..x.ncols() {
        let column = x.column(j);
        let m = column.sum() / n;
        let var = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
        mean[j] = m;
        let s = var.sqrt();
        std[j] = if s > 0.0 && s.is_finite() { s } else { 1.0 };
    }

    (mean, std)
}

fn standardize(x: &Array2<f64>, mean: &Array1<f64>, std: &Array1<f64>) -> Array2<f64> {
    let mut out = x.clone();
    for j in 0..out.ncols().min(mean.len()) {
        let m = mean[j];
        let s = std[j];
        out.column_mut(j).mapv_inplace(|v| (v - m) / s);
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
