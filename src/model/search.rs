//! Hyperparameter selection over a fixed candidate grid.
//!
//! Candidates are evaluated in declared order with purged time-series
//! cross-validation; a candidate's score is the mean fold macro-F1 minus
//! one standard deviation, penalizing configurations that only work on
//! some regimes. The first candidate achieving the best score wins, so a
//! rerun of the same search picks the same configuration.

use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::labeling::PurgedTimeSeriesSplit;

use super::metrics::macro_f1;
use super::softmax::{SoftmaxClassifier, SoftmaxParams};
use super::Classifier;

/// Rounds without validation improvement before a fold fit stops.
pub const DEFAULT_EARLY_STOPPING_ROUNDS: usize = 30;

fn default_n_splits() -> usize {
    5
}

fn default_early_stopping_rounds() -> usize {
    DEFAULT_EARLY_STOPPING_ROUNDS
}

fn default_candidates() -> Vec<SoftmaxParams> {
    let mut grid = Vec::new();
    for &learning_rate in &[0.03, 0.1] {
        for &l2 in &[1.0, 3.0] {
            for &n_rounds in &[200, 500] {
                grid.push(SoftmaxParams {
                    learning_rate,
                    l2,
                    n_rounds,
                });
            }
        }
    }
    grid
}

/// Configuration for the search stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Cross-validation folds per candidate.
    #[serde(default = "default_n_splits")]
    pub n_splits: usize,
    /// Early-stopping patience for each fold fit.
    #[serde(default = "default_early_stopping_rounds")]
    pub early_stopping_rounds: usize,
    /// Candidate grid, tried in this order.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<SoftmaxParams>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_splits: default_n_splits(),
            early_stopping_rounds: default_early_stopping_rounds(),
            candidates: default_candidates(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.n_splits < 2 {
            return Err("n_splits must be >= 2".to_string());
        }
        if self.early_stopping_rounds == 0 {
            return Err("early_stopping_rounds must be >= 1".to_string());
        }
        if self.candidates.is_empty() {
            return Err("candidate grid must not be empty".to_string());
        }
        for candidate in &self.candidates {
            candidate.validate()?;
        }
        Ok(())
    }
}

/// Cross-validated result for one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub params: SoftmaxParams,
    /// Mean minus one standard deviation of fold macro-F1; 0 when fewer
    /// than two folds were usable.
    pub score: f64,
    pub folds_used: usize,
}

/// Outcome of the full grid evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub best: SoftmaxParams,
    pub best_score: f64,
    /// Every candidate in evaluation order.
    pub candidates: Vec<CandidateScore>,
}

fn distinct_classes(y: &[usize]) -> usize {
    let mut seen: Vec<usize> = y.to_vec();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// Evaluate the grid on the train segment and pick the winner.
///
/// `gap` is the label horizon: folds are purged by it so validation labels
/// cannot leak into fold training windows.
pub fn search_hyperparameters(
    x: ArrayView2<'_, f64>,
    y: &[usize],
    n_classes: usize,
    gap: usize,
    config: &SearchConfig,
) -> Result<SearchOutcome> {
    config.validate().map_err(PipelineError::config)?;
    let folds = PurgedTimeSeriesSplit::new(config.n_splits, gap).split(y.len())?;

    let mut candidates = Vec::with_capacity(config.candidates.len());
    for params in &config.candidates {
        let mut fold_scores = Vec::with_capacity(folds.len());
        for fold in &folds {
            let y_train = &y[fold.train.clone()];
            if distinct_classes(y_train) < 2 {
                debug!(?fold, "fold skipped: single-class training window");
                continue;
            }
            let (model, _) = SoftmaxClassifier::fit_with_eval(
                params,
                n_classes,
                x.slice(s![fold.train.clone(), ..]),
                y_train,
                x.slice(s![fold.test.clone(), ..]),
                &y[fold.test.clone()],
                config.early_stopping_rounds,
            )?;
            let predictions = model.predict(x.slice(s![fold.test.clone(), ..]));
            fold_scores.push(macro_f1(&y[fold.test.clone()], &predictions));
        }

        let score = if fold_scores.len() >= 2 {
            let mean = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            let variance = fold_scores
                .iter()
                .map(|s| (s - mean).powi(2))
                .sum::<f64>()
                / fold_scores.len() as f64;
            mean - variance.sqrt()
        } else {
            0.0
        };
        debug!(?params, score, folds_used = fold_scores.len(), "candidate evaluated");
        candidates.push(CandidateScore {
            params: *params,
            score,
            folds_used: fold_scores.len(),
        });
    }

    // Strict improvement only, so ties resolve to the earliest candidate.
    let mut best_index = 0;
    for (i, candidate) in candidates.iter().enumerate() {
        if candidate.score > candidates[best_index].score {
            best_index = i;
        }
    }
    let best = candidates[best_index].params;
    let best_score = candidates[best_index].score;
    info!(?best, best_score, "hyperparameter search finished");

    Ok(SearchOutcome {
        best,
        best_score,
        candidates,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
