//! Forward returns, tertile cutoffs, and the chronological train/test split.

use serde::Serialize;
use tracing::debug;

use crate::error::{PipelineError, Result, MIN_LABELED_ROWS};
use crate::preprocessing::{quantile_sorted, valid_sorted};

use super::TrendClass;

/// Return realized from row t to row t + horizon.
///
/// Tail rows (and rows around missing prices) are NaN.
pub fn forward_return(close: &[f64], horizon: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    for i in 0..n.saturating_sub(horizon) {
        let now = close[i];
        let later = close[i + horizon];
        if now.is_finite() && later.is_finite() && now != 0.0 {
            out[i] = later / now - 1.0;
        }
    }
    out
}

/// Return realized over the `horizon` rows ending at row t.
///
/// Head rows are NaN. This is the naive signal the persistence baseline
/// classifies with the train cutoffs.
pub fn past_return(close: &[f64], horizon: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    for i in horizon..n {
        let earlier = close[i - horizon];
        let now = close[i];
        if now.is_finite() && earlier.is_finite() && earlier != 0.0 {
            out[i] = now / earlier - 1.0;
        }
    }
    out
}

/// Tertile boundaries of the train forward-return distribution.
///
/// Outer edges are open: any finite return classifies, however far outside
/// the train range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TertileCutoffs {
    pub lower: f64,
    pub upper: f64,
}

impl TertileCutoffs {
    /// Fit the 1/3 and 2/3 quantiles of `returns`.
    ///
    /// Fails with [`PipelineError::DegenerateColumn`] when the boundaries
    /// collapse (a return distribution too flat to carve into three
    /// classes).
    pub fn fit(returns: &[f64]) -> Result<Self> {
        let sorted = valid_sorted(returns);
        if sorted.is_empty() {
            return Err(PipelineError::DegenerateColumn {
                column: "forward_return".to_string(),
            });
        }
        let lower = quantile_sorted(&sorted, 1.0 / 3.0);
        let upper = quantile_sorted(&sorted, 2.0 / 3.0);
        if !(upper > lower) {
            return Err(PipelineError::DegenerateColumn {
                column: "forward_return".to_string(),
            });
        }
        Ok(Self { lower, upper })
    }

    /// Right-closed class assignment: `(-inf, lower]`, `(lower, upper]`,
    /// `(upper, +inf)`. NaN returns None.
    pub fn classify(&self, ret: f64) -> Option<TrendClass> {
        if ret.is_nan() {
            None
        } else if ret <= self.lower {
            Some(TrendClass::Down)
        } else if ret <= self.upper {
            Some(TrendClass::Flat)
        } else {
            Some(TrendClass::Up)
        }
    }
}

/// One (ticker, horizon) unit after labeling and splitting.
///
/// `kept_rows` indexes back into the unit's original row order; everything
/// else is aligned to the kept rows. Rows `[0, split)` are train, the rest
/// test.
#[derive(Debug, Clone)]
pub struct LabeledUnit {
    pub kept_rows: Vec<usize>,
    pub split: usize,
    pub cutoffs: TertileCutoffs,
    pub classes: Vec<TrendClass>,
    pub forward_returns: Vec<f64>,
}

impl LabeledUnit {
    pub fn n_rows(&self) -> usize {
        self.kept_rows.len()
    }

    pub fn n_train(&self) -> usize {
        self.split
    }

    pub fn n_test(&self) -> usize {
        self.kept_rows.len() - self.split
    }

    pub fn train_classes(&self) -> &[TrendClass] {
        &self.classes[..self.split]
    }

    pub fn test_classes(&self) -> &[TrendClass] {
        &self.classes[self.split..]
    }

    /// Classes as indices for the classifier layer.
    pub fn class_indices(&self) -> Vec<usize> {
        self.classes.iter().map(|c| c.as_index()).collect()
    }

    /// Distinct classes present in the train segment.
    pub fn train_class_count(&self) -> usize {
        let mut seen = [false; TrendClass::COUNT];
        for class in self.train_classes() {
            seen[class.as_index()] = true;
        }
        seen.iter().filter(|&&s| s).count()
    }
}

/// Label one close series for one horizon.
///
/// Drops rows with undefined forward returns, requires at least
/// [`MIN_LABELED_ROWS`] survivors, splits chronologically, fits cutoffs on
/// the train segment only, and classifies every kept row with those
/// cutoffs.
pub fn build_labels(close: &[f64], horizon: usize, train_fraction: f64) -> Result<LabeledUnit> {
    let fwd = forward_return(close, horizon);
    let kept_rows: Vec<usize> = (0..close.len()).filter(|&i| fwd[i].is_finite()).collect();
    if kept_rows.len() < MIN_LABELED_ROWS {
        return Err(PipelineError::InsufficientHistory {
            valid: kept_rows.len(),
            required: MIN_LABELED_ROWS,
        });
    }

    let split = (train_fraction * kept_rows.len() as f64).floor() as usize;
    let forward_returns: Vec<f64> = kept_rows.iter().map(|&i| fwd[i]).collect();
    let cutoffs = TertileCutoffs::fit(&forward_returns[..split])?;
    let classes: Vec<TrendClass> = forward_returns
        .iter()
        .map(|&r| cutoffs.classify(r).unwrap_or(TrendClass::Flat))
        .collect();

    debug!(
        horizon,
        rows = kept_rows.len(),
        split,
        lower = cutoffs.lower,
        upper = cutoffs.upper,
        "unit labeled"
    );
    Ok(LabeledUnit {
        kept_rows,
        split,
        cutoffs,
        classes,
        forward_returns,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sinusoidal_close(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 * (1.0 + 0.1 * (i as f64 * 0.35).sin()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Returns
    // ------------------------------------------------------------------

    #[test]
    fn test_forward_return_values() {
        let close = vec![100.0, 110.0, 121.0];
        let fwd = forward_return(&close, 1);
        assert!((fwd[0] - 0.10).abs() < 1e-12);
        assert!((fwd[1] - 0.10).abs() < 1e-12);
        assert!(fwd[2].is_nan());
    }

    #[test]
    fn test_forward_return_skips_missing_prices() {
        let close = vec![100.0, f64::NAN, 121.0, 133.1];
        let fwd = forward_return(&close, 1);
        assert!(fwd[0].is_nan());
        assert!(fwd[1].is_nan());
        assert!((fwd[2] - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_past_return_mirrors_forward() {
        let close = sinusoidal_close(50);
        let fwd = forward_return(&close, 7);
        let past = past_return(&close, 7);
        for i in 0..43 {
            assert!((fwd[i] - past[i + 7]).abs() < 1e-12);
        }
        assert!(past[6].is_nan());
    }

    // ------------------------------------------------------------------
    // Cutoffs
    // ------------------------------------------------------------------

    #[test]
    fn test_cutoffs_are_tertiles() {
        // 0..=8: the 1/3 quantile interpolates between sorted positions.
        let returns: Vec<f64> = (0..9).map(|i| i as f64).collect();
        let cutoffs = TertileCutoffs::fit(&returns).unwrap();
        assert!((cutoffs.lower - 8.0 / 3.0).abs() < 1e-12);
        assert!((cutoffs.upper - 16.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_classify_boundaries_right_closed() {
        let cutoffs = TertileCutoffs {
            lower: -0.01,
            upper: 0.01,
        };
        assert_eq!(cutoffs.classify(-0.01), Some(TrendClass::Down));
        assert_eq!(cutoffs.classify(-0.0099), Some(TrendClass::Flat));
        assert_eq!(cutoffs.classify(0.01), Some(TrendClass::Flat));
        assert_eq!(cutoffs.classify(0.0101), Some(TrendClass::Up));
        assert_eq!(cutoffs.classify(f64::NAN), None);
        // Open outer edges: anything finite classifies.
        assert_eq!(cutoffs.classify(-99.0), Some(TrendClass::Down));
        assert_eq!(cutoffs.classify(99.0), Some(TrendClass::Up));
    }

    #[test]
    fn test_flat_returns_are_degenerate() {
        let returns = vec![0.01; 50];
        let err = TertileCutoffs::fit(&returns).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateColumn { .. }));
        assert!(!err.is_fatal());
    }

    // ------------------------------------------------------------------
    // Unit labeling
    // ------------------------------------------------------------------

    #[test]
    fn test_short_history_skipped() {
        let close = sinusoidal_close(80);
        let err = build_labels(&close, 7, 0.8).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientHistory {
                valid: 73,
                required: 100,
            }
        ));
    }

    #[test]
    fn test_split_is_floor_of_fraction() {
        let close = sinusoidal_close(200);
        let unit = build_labels(&close, 7, 0.8).unwrap();
        // 193 labeled rows; floor(0.8 * 193) = 154.
        assert_eq!(unit.n_rows(), 193);
        assert_eq!(unit.split, 154);
        assert_eq!(unit.n_test(), 39);
    }

    #[test]
    fn test_train_covers_all_three_classes() {
        let close = sinusoidal_close(200);
        let unit = build_labels(&close, 7, 0.8).unwrap();
        assert_eq!(unit.train_class_count(), 3);
        // Tertile construction puts roughly a third of train rows in each
        // class.
        let down = unit
            .train_classes()
            .iter()
            .filter(|c| **c == TrendClass::Down)
            .count();
        assert!(down > unit.n_train() / 4 && down < unit.n_train() / 2);
    }

    #[test]
    fn test_cutoffs_blind_to_test_rows() {
        let close = sinusoidal_close(200);
        let unit = build_labels(&close, 7, 0.8).unwrap();

        // Amplify the tail so test-period returns change wildly; the
        // cutoffs must not move. The perturbed region must stay clear of
        // rows whose forward window reaches into it from the train side.
        let mut perturbed = close.clone();
        for (i, price) in perturbed.iter_mut().enumerate().skip(170) {
            *price *= 1.0 + 0.5 * (i as f64 * 0.9).sin().abs();
        }
        let perturbed_unit = build_labels(&perturbed, 7, 0.8).unwrap();
        assert_eq!(unit.cutoffs, perturbed_unit.cutoffs);
        assert_eq!(unit.train_classes(), perturbed_unit.train_classes());
    }

    #[test]
    fn test_labels_invariant_under_price_scaling() {
        let close = sinusoidal_close(200);
        let scaled: Vec<f64> = close.iter().map(|c| c * 37.5).collect();
        let a = build_labels(&close, 7, 0.8).unwrap();
        let b = build_labels(&scaled, 7, 0.8).unwrap();
        assert_eq!(a.classes, b.classes);
        assert_eq!(a.split, b.split);
    }
}
