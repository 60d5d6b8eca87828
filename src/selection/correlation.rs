//! Dense absolute-correlation matrix over feature columns.
//!
//! The greedy selector repeatedly asks "how correlated is candidate X with
//! everything picked so far". Computing Pearson pairs on demand would rescan
//! the same columns once per group, so the matrix is materialized once up
//! front and the selector reduces over rows of it.

use ahash::AHashMap;
use ndarray::Array2;

use crate::error::{PipelineError, Result};
use crate::features::rolling::EPSILON;
use crate::frame::FeatureMatrix;

/// Absolute pairwise Pearson correlations with the diagonal forced to zero.
///
/// Entries are computed over pairwise-complete observations: a row counts
/// toward the (i, j) entry only when both columns are finite there. Pairs
/// with fewer than two shared observations, and pairs involving a constant
/// column, hold NaN.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    index: AHashMap<String, usize>,
    values: Array2<f64>,
}

impl CorrelationMatrix {
    /// Build the matrix from the named columns of `matrix`.
    ///
    /// Columns with no valid observations at all are silently excluded,
    /// mirroring a drop of all-missing columns before correlation. Fails
    /// with [`PipelineError::InsufficientFeatures`] when fewer than two
    /// columns survive.
    pub fn compute(matrix: &FeatureMatrix, columns: &[String]) -> Result<Self> {
        let mut names = Vec::with_capacity(columns.len());
        let mut data: Vec<&[f64]> = Vec::with_capacity(columns.len());
        for name in columns {
            let values = matrix.column(name).ok_or_else(|| {
                PipelineError::MissingRequiredColumn {
                    column: name.clone(),
                    table: "feature matrix".to_string(),
                }
            })?;
            if values.iter().any(|v| v.is_finite()) {
                names.push(name.clone());
                data.push(values);
            }
        }

        if names.len() < 2 {
            return Err(PipelineError::InsufficientFeatures {
                available: names.len(),
            });
        }

        let p = names.len();
        let mut values = Array2::from_elem((p, p), f64::NAN);
        for i in 0..p {
            values[(i, i)] = 0.0;
            for j in (i + 1)..p {
                let c = pairwise_abs_corr(data[i], data[j]);
                values[(i, j)] = c;
                values[(j, i)] = c;
            }
        }

        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Ok(Self {
            names,
            index,
            values,
        })
    }

    /// Column names that survived the all-missing filter, in input order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Absolute correlation between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = *self.index.get(a)?;
        let j = *self.index.get(b)?;
        Some(self.values[(i, j)])
    }

    /// Largest finite |correlation| between `feature` and any of `others`.
    ///
    /// NaN entries are skipped the way a column-wise max skips missing
    /// values. Returns NaN when nothing comparable remains, and None when
    /// `feature` itself is not in the matrix.
    pub fn max_abs_against(&self, feature: &str, others: &[String]) -> Option<f64> {
        let i = *self.index.get(feature)?;
        let mut best = f64::NAN;
        for other in others {
            let Some(&j) = self.index.get(other.as_str()) else {
                continue;
            };
            let c = self.values[(i, j)];
            if c.is_nan() {
                continue;
            }
            if best.is_nan() || c > best {
                best = c;
            }
        }
        Some(best)
    }
}

/// |Pearson| over rows where both sides are finite.
fn pairwise_abs_corr(x: &[f64], y: &[f64]) -> f64 {
    let mut n = 0usize;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        if a.is_finite() && b.is_finite() {
            n += 1;
            sum_x += a;
            sum_y += b;
        }
    }
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = sum_x / n as f64;
    let mean_y = sum_y / n as f64;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        if a.is_finite() && b.is_finite() {
            let dx = a - mean_x;
            let dy = b - mean_y;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
    }
    if sxx < EPSILON || syy < EPSILON {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).abs()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn matrix_from(columns: Vec<(&str, Vec<f64>)>) -> FeatureMatrix {
        let n = columns[0].1.len();
        let dates = (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Days::new(i as u64))
            .collect();
        let tickers = vec!["BTC".to_string(); n];
        let mut m = FeatureMatrix::from_keys(dates, tickers).unwrap();
        for (name, values) in columns {
            m.push_column(name, values).unwrap();
        }
        m
    }

    fn all(m: &FeatureMatrix) -> Vec<String> {
        m.column_names().to_vec()
    }

    // ------------------------------------------------------------------
    // Pairwise kernel
    // ------------------------------------------------------------------

    #[test]
    fn test_linear_pair_is_one() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 7.0).collect();
        assert!((pairwise_abs_corr(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_anticorrelated_pair_is_one_after_abs() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| -v).collect();
        assert!((pairwise_abs_corr(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_orthogonal_waves_near_zero() {
        let n = 64;
        let x: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / n as f64).sin())
            .collect();
        let y: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos())
            .collect();
        assert!(pairwise_abs_corr(&x, &y) < 1e-10);
    }

    #[test]
    fn test_constant_column_yields_nan() {
        let x = vec![1.0; 10];
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert!(pairwise_abs_corr(&x, &y).is_nan());
    }

    #[test]
    fn test_pairwise_complete_ignores_nan_rows() {
        // The NaN row carries the only disagreement, so the complete rows
        // correlate perfectly.
        let x = vec![1.0, 2.0, f64::NAN, 4.0, 5.0];
        let y = vec![2.0, 4.0, 100.0, 8.0, 10.0];
        assert!((pairwise_abs_corr(&x, &y) - 1.0).abs() < 1e-12);
    }

    // ------------------------------------------------------------------
    // Matrix assembly
    // ------------------------------------------------------------------

    #[test]
    fn test_diagonal_forced_to_zero() {
        let m = matrix_from(vec![
            ("a", (0..10).map(|i| i as f64).collect()),
            ("b", (0..10).map(|i| (i * i) as f64).collect()),
        ]);
        let corr = CorrelationMatrix::compute(&m, &all(&m)).unwrap();
        assert_eq!(corr.get("a", "a"), Some(0.0));
        assert_eq!(corr.get("b", "b"), Some(0.0));
    }

    #[test]
    fn test_all_missing_column_excluded() {
        let m = matrix_from(vec![
            ("a", (0..10).map(|i| i as f64).collect()),
            ("dead", vec![f64::NAN; 10]),
            ("b", (0..10).map(|i| (i as f64).sin()).collect()),
        ]);
        let corr = CorrelationMatrix::compute(&m, &all(&m)).unwrap();
        assert_eq!(corr.len(), 2);
        assert!(!corr.contains("dead"));
    }

    #[test]
    fn test_too_few_usable_columns_is_error() {
        let m = matrix_from(vec![
            ("a", (0..10).map(|i| i as f64).collect()),
            ("dead", vec![f64::NAN; 10]),
        ]);
        let err = CorrelationMatrix::compute(&m, &all(&m)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientFeatures { available: 1 }
        ));
    }

    #[test]
    fn test_max_abs_against_skips_nan_entries() {
        let m = matrix_from(vec![
            ("a", (0..10).map(|i| i as f64).collect()),
            ("flat", vec![5.0; 10]),
            ("c", (0..10).map(|i| 2.0 * i as f64).collect()),
        ]);
        let corr = CorrelationMatrix::compute(&m, &all(&m)).unwrap();
        // a-flat is NaN and must not leak into the max.
        let best = corr
            .max_abs_against("a", &["flat".to_string(), "c".to_string()])
            .unwrap();
        assert!((best - 1.0).abs() < 1e-12);
        // Against only the flat column there is nothing comparable.
        let none = corr.max_abs_against("a", &["flat".to_string()]).unwrap();
        assert!(none.is_nan());
    }

    #[test]
    fn test_symmetry() {
        let m = matrix_from(vec![
            ("a", (0..30).map(|i| (i as f64 * 0.3).sin()).collect()),
            ("b", (0..30).map(|i| (i as f64 * 0.7).cos()).collect()),
        ]);
        let corr = CorrelationMatrix::compute(&m, &all(&m)).unwrap();
        assert_eq!(corr.get("a", "b"), corr.get("b", "a"));
    }
}
