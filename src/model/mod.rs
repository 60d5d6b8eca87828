//! Trend classification models and their evaluation.
//!
//! The boundary into this module is deliberately narrow: a rectangular
//! feature matrix (`ArrayView2<f64>`) plus aligned integer labels go in,
//! a fitted [`Classifier`] comes out. Everything upstream (selection,
//! fuzzy encoding, scaling) produces that matrix; nothing in here knows
//! about tickers, dates, or column names.
//!
//! - [`softmax`] is the trained model: multinomial logistic regression
//!   with L2 shrinkage and optional early stopping.
//! - [`search`] picks its hyperparameters with purged cross-validation.
//! - [`baseline`] supplies the majority-class and persistence references
//!   every trained model must beat.
//! - [`metrics`] scores predictions and assembles evaluation reports.

pub mod baseline;
pub mod metrics;
pub mod search;
pub mod softmax;

pub use baseline::{one_hot_probabilities, persistence_predictions, MajorityClassifier};
pub use metrics::{
    accuracy, confusion_matrix, evaluate_predictions, log_loss, macro_f1, ClassMetrics,
    EvaluationReport,
};
pub use search::{
    search_hyperparameters, CandidateScore, SearchConfig, SearchOutcome,
    DEFAULT_EARLY_STOPPING_ROUNDS,
};
pub use softmax::{FitSummary, SoftmaxClassifier, SoftmaxParams};

use ndarray::{Array2, ArrayView2};

/// A fitted multi-class probabilistic classifier.
///
/// Implementations are constructed already fitted, so calling these
/// methods can never observe an untrained model.
pub trait Classifier {
    /// Class probabilities per row; each row sums to 1.
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array2<f64>;

    /// Hard class assignments: the first class attaining the row maximum.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<usize> {
        self.predict_proba(x)
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (j, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = j;
                    }
                }
                best
            })
            .collect()
    }

    /// Per-feature contribution weights; empty when the model consults
    /// no features.
    fn feature_importance(&self) -> Vec<f64>;
}

/// Pair feature names with importance scores, highest first.
pub fn sorted_importances(names: &[String], scores: &[f64]) -> Vec<(String, f64)> {
    let mut pairs: Vec<(String, f64)> = names
        .iter()
        .zip(scores.iter())
        .map(|(n, &s)| (n.clone(), s))
        .collect();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    pairs
}

// ============================================================================
// Unit Tests
// ============================================================================
