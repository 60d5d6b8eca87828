//! Classification metrics for three-way trend evaluation.

use ndarray::ArrayView2;
use serde::Serialize;

/// Probability floor applied before taking logs.
const PROB_CLAMP: f64 = 1e-15;

/// Fraction of rows where predicted class equals actual.
pub fn accuracy(actual: &[usize], predicted: &[usize]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| a == p)
        .count();
    hits as f64 / actual.len() as f64
}

/// Unweighted mean F1 over every class present in either vector.
///
/// A class with zero predicted or zero actual rows contributes an F1 of
/// 0 rather than poisoning the mean with a division by zero.
pub fn macro_f1(actual: &[usize], predicted: &[usize]) -> f64 {
    let mut labels: Vec<usize> = actual.iter().chain(predicted).copied().collect();
    labels.sort_unstable();
    labels.dedup();
    if labels.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for &label in &labels {
        let tp = actual
            .iter()
            .zip(predicted)
            .filter(|(a, p)| **a == label && **p == label)
            .count() as f64;
        let predicted_count = predicted.iter().filter(|p| **p == label).count() as f64;
        let actual_count = actual.iter().filter(|a| **a == label).count() as f64;

        let precision = if predicted_count > 0.0 { tp / predicted_count } else { 0.0 };
        let recall = if actual_count > 0.0 { tp / actual_count } else { 0.0 };
        if precision + recall > 0.0 {
            total += 2.0 * precision * recall / (precision + recall);
        }
    }
    total / labels.len() as f64
}

/// Mean negative log probability of the true class.
///
/// Rows are clamped away from 0/1 and renormalized, so a degenerate
/// one-hot probability vector yields a large finite loss instead of
/// infinity.
pub fn log_loss(actual: &[usize], probabilities: &ArrayView2<'_, f64>) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for (i, &class) in actual.iter().enumerate() {
        let row = probabilities.row(i);
        let clamped: Vec<f64> = row
            .iter()
            .map(|p| p.clamp(PROB_CLAMP, 1.0 - PROB_CLAMP))
            .collect();
        let sum: f64 = clamped.iter().sum();
        total -= (clamped[class] / sum).ln();
    }
    total / actual.len() as f64
}

/// Counts indexed `[actual][predicted]`.
pub fn confusion_matrix(actual: &[usize], predicted: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&a, &p) in actual.iter().zip(predicted) {
        if a < n_classes && p < n_classes {
            matrix[a][p] += 1;
        }
    }
    matrix
}

/// Per-class precision/recall/F1 with support.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Full evaluation of one predictor on one labeled segment.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub macro_f1: f64,
    pub log_loss: f64,
    /// Counts indexed `[actual][predicted]`.
    pub confusion: Vec<Vec<usize>>,
    /// One entry per class index.
    pub classes: Vec<ClassMetrics>,
}

/// Evaluate hard predictions and probability vectors against the truth.
pub fn evaluate_predictions(
    actual: &[usize],
    predicted: &[usize],
    probabilities: &ArrayView2<'_, f64>,
    n_classes: usize,
) -> EvaluationReport {
    let confusion = confusion_matrix(actual, predicted, n_classes);
    let classes = (0..n_classes)
        .map(|label| {
            let tp = confusion[label][label] as f64;
            let predicted_count: usize = (0..n_classes).map(|a| confusion[a][label]).sum();
            let support: usize = confusion[label].iter().sum();
            let precision = if predicted_count > 0 { tp / predicted_count as f64 } else { 0.0 };
            let recall = if support > 0 { tp / support as f64 } else { 0.0 };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    EvaluationReport {
        accuracy: accuracy(actual, predicted),
        macro_f1: macro_f1(actual, predicted),
        log_loss: log_loss(actual, probabilities),
        confusion,
        classes,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 2, 1], &[0, 1, 1, 1]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_macro_f1_hand_computed() {
        // Class 0: p=2/3, r=1, f1=0.8; classes 1 and 2: f1=0.
        let actual = [0, 1, 2, 0, 1, 2];
        let predicted = [0, 2, 1, 0, 0, 1];
        let f1 = macro_f1(&actual, &predicted);
        assert!((f1 - 0.8 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_macro_f1_averages_over_present_classes_only() {
        // Only class 0 appears anywhere, so the mean is over one class.
        assert_eq!(macro_f1(&[0, 0, 0], &[0, 0, 0]), 1.0);
    }

    #[test]
    fn test_macro_f1_zero_division_guard() {
        // Class 1 is predicted but never actual; class 0 never predicted.
        let f1 = macro_f1(&[0, 0], &[1, 1]);
        assert_eq!(f1, 0.0);
    }

    #[test]
    fn test_log_loss_uniform() {
        let probs = array![
            [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]
        ];
        let loss = log_loss(&[0, 2], &probs.view());
        assert!((loss - 3.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_log_loss_clamps_degenerate_rows() {
        // The true class has probability zero; the clamp keeps the loss
        // finite.
        let probs = array![[0.0, 1.0, 0.0]];
        let loss = log_loss(&[0], &probs.view());
        assert!(loss.is_finite());
        assert!(loss > 30.0);
    }

    #[test]
    fn test_confusion_matrix_layout() {
        let m = confusion_matrix(&[0, 0, 1, 2], &[0, 1, 1, 1], 3);
        assert_eq!(m[0], vec![1, 1, 0]);
        assert_eq!(m[1], vec![0, 1, 0]);
        assert_eq!(m[2], vec![0, 1, 0]);
    }

    #[test]
    fn test_report_consistency() {
        let actual = [0, 1, 2, 0, 1, 2, 1];
        let predicted = [0, 1, 2, 0, 2, 2, 1];
        let probs = ndarray::Array2::from_elem((7, 3), 1.0 / 3.0);
        let report = evaluate_predictions(&actual, &predicted, &probs.view(), 3);
        assert!((report.accuracy - 6.0 / 7.0).abs() < 1e-12);
        assert_eq!(report.classes.len(), 3);
        assert_eq!(report.classes[1].support, 3);
        assert!((report.classes[1].recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.classes[0].precision, 1.0);
        let total: usize = report.confusion.iter().flatten().sum();
        assert_eq!(total, 7);
    }
}
