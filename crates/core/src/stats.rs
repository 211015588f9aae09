//! Classification metrics shared by model evaluation and backtesting.

/// Area under the ROC curve, computed by a descending threshold sweep with
/// tied scores advancing together and trapezoidal interpolation between
/// curve points.
///
/// Returns 0.5 when only one label class is present — the convention used
/// throughout walk-forward fold reporting rather than propagating NaN.
///
/// # Examples
/// ```
/// use sentibar_core::stats::auc_roc;
///
/// let auc = auc_roc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]);
/// assert!((auc - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn auc_roc(y_true: &[u8], y_prob: &[f64]) -> f64 {
    let n = y_true.len().min(y_prob.len());
    if n == 0 {
        return 0.5;
    }

    let mut pairs: Vec<(f64, bool)> = y_prob[..n]
        .iter()
        .zip(&y_true[..n])
        .map(|(&p, &t)| (p, t == 1))
        .collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let n_pos = pairs.iter().filter(|(_, t)| *t).count() as f64;
    let n_neg = n as f64 - n_pos;
    if n_pos < 0.5 || n_neg < 0.5 {
        return 0.5;
    }

    let mut auc = 0.0;
    let mut tp = 0.0;
    let mut fp = 0.0;
    let mut tpr_prev = 0.0;
    let mut fpr_prev = 0.0;

    let mut i = 0;
    while i < n {
        let score = pairs[i].0;
        let mut j = i;
        while j < n && (pairs[j].0 - score).abs() < 1e-12 {
            if pairs[j].1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            j += 1;
        }

        let tpr = tp / n_pos;
        let fpr = fp / n_neg;
        auc += (fpr - fpr_prev) * (tpr + tpr_prev) / 2.0;
        tpr_prev = tpr;
        fpr_prev = fpr;
        i = j;
    }

    auc
}

/// Brier score: mean squared error between predicted probabilities and
/// binary outcomes. Lower is better; 0.0 for empty input.
#[must_use]
pub fn brier_score(y_true: &[u8], y_prob: &[f64]) -> f64 {
    let n = y_true.len().min(y_prob.len());
    if n == 0 {
        return 0.0;
    }
    y_prob[..n]
        .iter()
        .zip(&y_true[..n])
        .map(|(&p, &t)| {
            let d = p - f64::from(t);
            d * d
        })
        .sum::<f64>()
        / n as f64
}

/// Fraction of rows where thresholding the probability strictly above 0.5
/// recovers the label. 0.0 for empty input.
#[must_use]
pub fn accuracy(y_true: &[u8], y_prob: &[f64]) -> f64 {
    let n = y_true.len().min(y_prob.len());
    if n == 0 {
        return 0.0;
    }
    let correct = y_prob[..n]
        .iter()
        .zip(&y_true[..n])
        .filter(|(&p, &t)| (p > 0.5) == (t == 1))
        .count();
    correct as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // auc_roc
    // ============================================

    #[test]
    fn auc_is_one_for_perfectly_separated_scores() {
        let auc = auc_roc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]);
        assert!((auc - 1.0).abs() < 1e-12, "auc was {auc}");
    }

    #[test]
    fn auc_is_zero_for_perfectly_inverted_scores() {
        let auc = auc_roc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]);
        assert!(auc.abs() < 1e-12, "auc was {auc}");
    }

    #[test]
    fn auc_is_half_when_all_scores_tie() {
        let auc = auc_roc(&[0, 1, 0, 1], &[0.5, 0.5, 0.5, 0.5]);
        assert!((auc - 0.5).abs() < 1e-12, "auc was {auc}");
    }

    #[test]
    fn auc_is_half_for_single_class_input() {
        assert!((auc_roc(&[1, 1, 1], &[0.2, 0.6, 0.9]) - 0.5).abs() < 1e-12);
        assert!((auc_roc(&[0, 0, 0], &[0.2, 0.6, 0.9]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn auc_is_half_for_empty_input() {
        assert!((auc_roc(&[], &[]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn auc_handles_partial_overlap() {
        // One inversion out of four positive/negative pairings.
        let auc = auc_roc(&[0, 1, 0, 1], &[0.1, 0.4, 0.35, 0.8]);
        assert!((auc - 0.75).abs() < 1e-12, "auc was {auc}");
    }

    // ============================================
    // brier_score
    // ============================================

    #[test]
    fn brier_is_zero_for_perfect_probabilities() {
        let brier = brier_score(&[0, 1, 1], &[0.0, 1.0, 1.0]);
        assert!(brier.abs() < 1e-12, "brier was {brier}");
    }

    #[test]
    fn brier_is_one_for_confidently_wrong_probabilities() {
        let brier = brier_score(&[0, 1], &[1.0, 0.0]);
        assert!((brier - 1.0).abs() < 1e-12, "brier was {brier}");
    }

    #[test]
    fn brier_of_uninformative_half_is_quarter() {
        let brier = brier_score(&[0, 1, 0, 1], &[0.5, 0.5, 0.5, 0.5]);
        assert!((brier - 0.25).abs() < 1e-12, "brier was {brier}");
    }

    #[test]
    fn brier_is_zero_for_empty_input() {
        assert!(brier_score(&[], &[]).abs() < 1e-12);
    }

    // ============================================
    // accuracy
    // ============================================

    #[test]
    fn accuracy_counts_thresholded_matches() {
        let acc = accuracy(&[1, 0, 1, 0], &[0.9, 0.1, 0.4, 0.6]);
        assert!((acc - 0.5).abs() < 1e-12, "accuracy was {acc}");
    }

    #[test]
    fn accuracy_treats_exactly_half_as_negative() {
        let acc = accuracy(&[0, 1], &[0.5, 0.5]);
        assert!((acc - 0.5).abs() < 1e-12, "accuracy was {acc}");
    }

    #[test]
    fn accuracy_is_zero_for_empty_input() {
        assert!(accuracy(&[], &[]).abs() < 1e-12);
    }
}
