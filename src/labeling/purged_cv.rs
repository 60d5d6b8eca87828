//! Expanding-window cross-validation with a purge gap.
//!
//! Forward-looking labels leak: the label at row t is a function of prices
//! up to t + h, so a validation block starting at row v is partially known
//! to any training row later than v - h. Each fold therefore ends its
//! training window `gap` rows before the validation block starts.

use crate::error::{PipelineError, Result};
use std::ops::Range;

/// Default fold count for hyperparameter evaluation.
pub const DEFAULT_N_SPLITS: usize = 5;

/// One train/validation pair of row ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Expanding-window splitter over `n` chronologically ordered rows.
///
/// The row set is divided into `n_splits + 1` contiguous blocks of
/// `n / (n_splits + 1)` rows (the remainder joins the first training
/// window). Fold k validates on block k+1 and trains on everything before
/// it, minus the last `gap` rows.
#[derive(Debug, Clone, Copy)]
pub struct PurgedTimeSeriesSplit {
    n_splits: usize,
    gap: usize,
}

impl PurgedTimeSeriesSplit {
    pub fn new(n_splits: usize, gap: usize) -> Self {
        Self { n_splits, gap }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn gap(&self) -> usize {
        self.gap
    }

    /// Fold ranges over `n` rows.
    ///
    /// Fails with [`PipelineError::InsufficientHistory`] when `n` cannot
    /// supply every fold a non-empty validation block and the first fold a
    /// non-empty training window after purging.
    pub fn split(&self, n: usize) -> Result<Vec<Fold>> {
        let test_size = n / (self.n_splits + 1);
        if test_size == 0 {
            return Err(PipelineError::InsufficientHistory {
                valid: n,
                required: self.n_splits + 1,
            });
        }
        let first_test_start = n - self.n_splits * test_size;
        if first_test_start <= self.gap {
            return Err(PipelineError::InsufficientHistory {
                valid: n,
                required: self.gap + self.n_splits * test_size + 1,
            });
        }

        let mut folds = Vec::with_capacity(self.n_splits);
        for k in 0..self.n_splits {
            let test_start = first_test_start + k * test_size;
            folds.push(Fold {
                train: 0..test_start - self.gap,
                test: test_start..test_start + test_size,
            });
        }
        Ok(folds)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split_without_gap() {
        let folds = PurgedTimeSeriesSplit::new(5, 0).split(120).unwrap();
        assert_eq!(folds.len(), 5);
        assert_eq!(folds[0], Fold { train: 0..20, test: 20..40 });
        assert_eq!(folds[1], Fold { train: 0..40, test: 40..60 });
        assert_eq!(folds[4], Fold { train: 0..100, test: 100..120 });
    }

    #[test]
    fn test_gap_purges_train_tail() {
        let folds = PurgedTimeSeriesSplit::new(5, 7).split(120).unwrap();
        assert_eq!(folds[0], Fold { train: 0..13, test: 20..40 });
        assert_eq!(folds[4], Fold { train: 0..93, test: 100..120 });
    }

    #[test]
    fn test_remainder_joins_first_train_window() {
        // 125 rows, 6 blocks of 20: the 5 leftover rows extend the earliest
        // training window rather than shifting validation blocks.
        let folds = PurgedTimeSeriesSplit::new(5, 0).split(125).unwrap();
        assert_eq!(folds[0], Fold { train: 0..25, test: 25..45 });
        assert_eq!(folds[4].test, 105..125);
    }

    #[test]
    fn test_no_train_row_within_gap_of_validation() {
        for gap in [1, 7, 30] {
            let folds = PurgedTimeSeriesSplit::new(5, gap).split(400).unwrap();
            assert_eq!(folds.len(), 5);
            for fold in &folds {
                assert!(fold.train.end + gap <= fold.test.start);
                assert!(!fold.train.is_empty());
                assert!(!fold.test.is_empty());
            }
        }
    }

    #[test]
    fn test_too_few_rows_for_folds() {
        let err = PurgedTimeSeriesSplit::new(5, 0).split(5).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientHistory { valid: 5, .. }
        ));
    }

    #[test]
    fn test_gap_swallowing_first_train_is_error() {
        // 40 rows, test_size 6, first validation starts at row 10; a gap of
        // 35 leaves no training rows at all.
        let err = PurgedTimeSeriesSplit::new(5, 35).split(40).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientHistory { .. }));
    }
}
