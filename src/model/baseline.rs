//! Reference predictors the trained model must beat.
//!
//! Two sanity floors: always predicting the most common training class,
//! and classifying the trailing return with the same tertile cutoffs the
//! labels were built from (momentum persistence).

use ndarray::{Array2, ArrayView2};

use crate::error::{PipelineError, Result};
use crate::labeling::{TertileCutoffs, TrendClass};

use super::Classifier;

/// Predicts the most frequent training class for every row.
#[derive(Debug, Clone)]
pub struct MajorityClassifier {
    majority: usize,
    n_classes: usize,
}

impl MajorityClassifier {
    /// Fit on training labels. Frequency ties go to the smallest class
    /// index, keeping the baseline deterministic.
    pub fn fit(y: &[usize], n_classes: usize) -> Result<Self> {
        if y.is_empty() {
            return Err(PipelineError::config("cannot fit majority class on empty labels"));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(PipelineError::config(format!(
                "label {bad} out of range for {n_classes} classes"
            )));
        }
        let mut counts = vec![0usize; n_classes];
        for &class in y {
            counts[class] += 1;
        }
        let majority = counts
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(class, _)| class)
            .unwrap_or(0);
        Ok(Self { majority, n_classes })
    }

    pub fn majority_class(&self) -> usize {
        self.majority
    }
}

impl Classifier for MajorityClassifier {
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        one_hot_probabilities(&vec![self.majority; x.nrows()], self.n_classes)
    }

    /// No features are consulted.
    fn feature_importance(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// Classify trailing returns with the label cutoffs; rows with no trailing
/// return yet fall back to `fallback` (typically the train majority).
pub fn persistence_predictions(
    past_returns: &[f64],
    cutoffs: &TertileCutoffs,
    fallback: TrendClass,
) -> Vec<usize> {
    past_returns
        .iter()
        .map(|&r| cutoffs.classify(r).unwrap_or(fallback).as_index())
        .collect()
}

/// Degenerate probability vectors for hard class predictions, so the
/// baselines can be scored with the same log-loss metric as the model.
pub fn one_hot_probabilities(classes: &[usize], n_classes: usize) -> Array2<f64> {
    let mut probs = Array2::zeros((classes.len(), n_classes));
    for (i, &class) in classes.iter().enumerate() {
        if class < n_classes {
            probs[(i, class)] = 1.0;
        }
    }
    probs
}

// ============================================================================
// Unit Tests
// ============================================================================
