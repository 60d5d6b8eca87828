//! Multinomial logistic regression trained by full-batch gradient descent.
//!
//! Deliberately the simplest model that exposes the full trainer surface:
//! probability outputs, per-feature importances, L2 shrinkage, and
//! round-based fitting with validation early stopping. Weights start at
//! zero, so training is deterministic for a given input.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};

use super::metrics::log_loss;
use super::Classifier;

/// Hyperparameters for one fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxParams {
    /// Step size for each gradient round.
    pub learning_rate: f64,
    /// L2 penalty on weights (not on the intercepts).
    pub l2: f64,
    /// Maximum gradient rounds.
    pub n_rounds: usize,
}

impl Default for SoftmaxParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            l2: 1.0,
            n_rounds: 200,
        }
    }
}

impl SoftmaxParams {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if !(self.l2 >= 0.0 && self.l2.is_finite()) {
            return Err(format!("l2 must be non-negative, got {}", self.l2));
        }
        if self.n_rounds == 0 {
            return Err("n_rounds must be >= 1".to_string());
        }
        Ok(())
    }
}

/// How a validation-monitored fit ended.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FitSummary {
    pub rounds_run: usize,
    pub best_round: usize,
    pub best_validation_loss: f64,
}

/// A fitted softmax model.
#[derive(Debug)]
pub struct SoftmaxClassifier {
    /// (n_features, n_classes)
    weights: Array2<f64>,
    bias: Array1<f64>,
    n_classes: usize,
}

impl SoftmaxClassifier {
    /// Fit on the full training segment for exactly `params.n_rounds`
    /// rounds.
    pub fn fit(
        params: &SoftmaxParams,
        n_classes: usize,
        x: ArrayView2<'_, f64>,
        y: &[usize],
    ) -> Result<Self> {
        let mut model = Self::initial(params, n_classes, x, y)?;
        for _ in 0..params.n_rounds {
            model.step(params, x, y);
        }
        Ok(model)
    }

    /// Fit while monitoring log loss on a validation segment, stopping
    /// after `patience` rounds without improvement and keeping the weights
    /// from the best round seen.
    pub fn fit_with_eval(
        params: &SoftmaxParams,
        n_classes: usize,
        x: ArrayView2<'_, f64>,
        y: &[usize],
        x_val: ArrayView2<'_, f64>,
        y_val: &[usize],
        patience: usize,
    ) -> Result<(Self, FitSummary)> {
        let mut model = Self::initial(params, n_classes, x, y)?;
        let mut best_loss = f64::INFINITY;
        let mut best_round = 0;
        let mut best_weights = model.weights.clone();
        let mut best_bias = model.bias.clone();
        let mut rounds_run = 0;

        for round in 1..=params.n_rounds {
            model.step(params, x, y);
            rounds_run = round;

            let val_probs = model.predict_proba(x_val);
            let loss = log_loss(y_val, &val_probs.view());
            if loss < best_loss {
                best_loss = loss;
                best_round = round;
                best_weights.assign(&model.weights);
                best_bias.assign(&model.bias);
            } else if round - best_round >= patience {
                debug!(round, best_round, best_loss, "validation loss stalled, stopping");
                break;
            }
        }

        model.weights = best_weights;
        model.bias = best_bias;
        Ok((
            model,
            FitSummary {
                rounds_run,
                best_round,
                best_validation_loss: best_loss,
            },
        ))
    }

    fn initial(
        params: &SoftmaxParams,
        n_classes: usize,
        x: ArrayView2<'_, f64>,
        y: &[usize],
    ) -> Result<Self> {
        params.validate().map_err(PipelineError::config)?;
        if n_classes < 2 {
            return Err(PipelineError::config("n_classes must be >= 2"));
        }
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(PipelineError::config(format!(
                "design matrix has {} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(PipelineError::config(format!(
                "label {bad} out of range for {n_classes} classes"
            )));
        }
        Ok(Self {
            weights: Array2::zeros((x.ncols(), n_classes)),
            bias: Array1::zeros(n_classes),
            n_classes,
        })
    }

    /// One full-batch gradient round.
    fn step(&mut self, params: &SoftmaxParams, x: ArrayView2<'_, f64>, y: &[usize]) {
        let n = x.nrows() as f64;
        // Cross-entropy gradient on logits: probs - one_hot(y).
        let mut grad = self.predict_proba(x);
        for (i, &class) in y.iter().enumerate() {
            grad[(i, class)] -= 1.0;
        }
        grad /= n;

        let grad_w = x.t().dot(&grad) + &(&self.weights * (params.l2 / n));
        let grad_b = grad.sum_axis(Axis(0));
        self.weights.scaled_add(-params.learning_rate, &grad_w);
        self.bias.scaled_add(-params.learning_rate, &grad_b);
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl Classifier for SoftmaxClassifier {
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut probs = x.dot(&self.weights) + &self.bias;
        for mut row in probs.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        probs
    }

    /// Mean absolute weight per feature, normalized to sum to 1.
    fn feature_importance(&self) -> Vec<f64> {
        let raw: Vec<f64> = self
            .weights
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|w| w.abs()).sum::<f64>())
            .collect();
        let total: f64 = raw.iter().sum();
        if total > 0.0 {
            raw.iter().map(|v| v / total).collect()
        } else {
            raw
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Three well-separated clusters, 20 rows each.
    fn clusters() -> (Array2<f64>, Vec<usize>) {
        let centers = [(0.0, 0.0), (5.0, 0.0), (0.0, 5.0)];
        let mut x = Array2::zeros((60, 2));
        let mut y = Vec::with_capacity(60);
        for i in 0..60 {
            let class = i % 3;
            let jitter = (i / 3 % 5) as f64 * 0.1;
            x[(i, 0)] = centers[class].0 + jitter;
            x[(i, 1)] = centers[class].1 - jitter;
            y.push(class);
        }
        (x, y)
    }

    fn fast_params() -> SoftmaxParams {
        SoftmaxParams {
            learning_rate: 0.5,
            l2: 0.01,
            n_rounds: 300,
        }
    }

    #[test]
    fn test_learns_separable_clusters() {
        let (x, y) = clusters();
        let model = SoftmaxClassifier::fit(&fast_params(), 3, x.view(), &y).unwrap();
        let predictions = model.predict(x.view());
        let hits = predictions.iter().zip(&y).filter(|(p, a)| p == a).count();
        assert!(hits >= 58, "only {hits}/60 correct");
    }

    #[test]
    fn test_probabilities_are_distributions() {
        let (x, y) = clusters();
        let model = SoftmaxClassifier::fit(&fast_params(), 3, x.view(), &y).unwrap();
        let probs = model.predict_proba(x.view());
        for row in probs.rows() {
            let sum: f64 = row.sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_zero_init_makes_training_deterministic() {
        let (x, y) = clusters();
        let a = SoftmaxClassifier::fit(&fast_params(), 3, x.view(), &y).unwrap();
        let b = SoftmaxClassifier::fit(&fast_params(), 3, x.view(), &y).unwrap();
        assert_eq!(a.predict_proba(x.view()), b.predict_proba(x.view()));
    }

    #[test]
    fn test_early_stopping_on_contradictory_validation() {
        let (x, y) = clusters();
        // Validation rows sit in class-1 territory but claim class 0, so
        // validation loss only degrades as the train fit improves.
        let mut x_val = Array2::zeros((10, 2));
        for i in 0..10 {
            x_val[(i, 0)] = 5.0;
        }
        let y_val = vec![0usize; 10];
        let params = SoftmaxParams {
            n_rounds: 500,
            ..fast_params()
        };
        let (_, summary) =
            SoftmaxClassifier::fit_with_eval(&params, 3, x.view(), &y, x_val.view(), &y_val, 10)
                .unwrap();
        assert!(summary.rounds_run < 500);
        assert!(summary.best_round <= 3);
    }

    #[test]
    fn test_best_round_weights_kept() {
        let (x, y) = clusters();
        let x_val = x.clone();
        let y_val = y.clone();
        // Clean validation over few rounds: loss improves strictly every
        // round, so the kept model is the final one and matches a plain
        // fit of the same length.
        let params = SoftmaxParams {
            n_rounds: 40,
            ..fast_params()
        };
        let (monitored, summary) = SoftmaxClassifier::fit_with_eval(
            &params,
            3,
            x.view(),
            &y,
            x_val.view(),
            &y_val,
            50,
        )
        .unwrap();
        assert_eq!(summary.best_round, summary.rounds_run);
        let plain = SoftmaxClassifier::fit(&params, 3, x.view(), &y).unwrap();
        let diff = (&monitored.predict_proba(x.view()) - &plain.predict_proba(x.view()))
            .iter()
            .map(|d| d.abs())
            .fold(0.0, f64::max);
        assert!(diff < 1e-12);
    }

    #[test]
    fn test_l2_shrinks_weights() {
        let (x, y) = clusters();
        let loose = SoftmaxClassifier::fit(
            &SoftmaxParams { l2: 0.0, ..fast_params() },
            3,
            x.view(),
            &y,
        )
        .unwrap();
        let tight = SoftmaxClassifier::fit(
            &SoftmaxParams { l2: 50.0, ..fast_params() },
            3,
            x.view(),
            &y,
        )
        .unwrap();
        let norm = |m: &SoftmaxClassifier| m.weights.iter().map(|w| w.abs()).sum::<f64>();
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_importances_normalized() {
        let (x, y) = clusters();
        let model = SoftmaxClassifier::fit(&fast_params(), 3, x.view(), &y).unwrap();
        let importance = model.feature_importance();
        assert_eq!(importance.len(), 2);
        assert!((importance.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(importance.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_label_out_of_range_rejected() {
        let x = Array2::zeros((4, 2));
        let err = SoftmaxClassifier::fit(&fast_params(), 3, x.view(), &[0, 1, 2, 3]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad = SoftmaxParams { learning_rate: 0.0, ..Default::default() };
        assert!(bad.validate().is_err());
        let x = Array2::zeros((2, 2));
        assert!(SoftmaxClassifier::fit(&bad, 3, x.view(), &[0, 1]).is_err());
    }
}
