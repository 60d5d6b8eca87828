//! Quantile estimation over possibly-missing samples.
//!
//! All quantile-derived parameters in the pipeline (fuzzy membership anchors,
//! tertile label cutoffs, CVaR tail thresholds) come through here so they share
//! one interpolation rule: linear interpolation between order statistics at
//! position `q * (n - 1)`. NaN values are excluded before ranking.

/// Sorted copy of the finite values in `values`.
pub fn valid_sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v
}

/// Quantile of an ascending-sorted non-empty slice, `q` in [0, 1].
///
/// Linear interpolation between adjacent order statistics.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    debug_assert!((0.0..=1.0).contains(&q));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Quantiles of the finite values at each probability point, or `None` when
/// no finite value exists.
pub fn quantiles(values: &[f64], probs: &[f64]) -> Option<Vec<f64>> {
    let sorted = valid_sorted(values);
    if sorted.is_empty() {
        return None;
    }
    Some(probs.iter().map(|&q| quantile_sorted(&sorted, q)).collect())
}

/// Median of the finite values, or `None` when no finite value exists.
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = valid_sorted(values);
    if sorted.is_empty() {
        None
    } else {
        Some(quantile_sorted(&sorted, 0.5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_linear_interpolation() {
        let sorted = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 0.0);
        assert_eq!(quantile_sorted(&sorted, 1.0), 4.0);
        assert_eq!(quantile_sorted(&sorted, 0.5), 2.0);
        // pos = 0.25 * 4 = 1.0 exactly on an order statistic
        assert_eq!(quantile_sorted(&sorted, 0.25), 1.0);
        // pos = 0.1 * 4 = 0.4, between 0.0 and 1.0
        assert!((quantile_sorted(&sorted, 0.1) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_two_points() {
        let sorted = vec![10.0, 20.0];
        assert!((quantile_sorted(&sorted, 1.0 / 3.0) - 13.333333333333334).abs() < 1e-9);
    }

    #[test]
    fn test_quantiles_skip_nan() {
        let values = vec![f64::NAN, 3.0, 1.0, f64::NAN, 2.0];
        let q = quantiles(&values, &[0.0, 0.5, 1.0]).unwrap();
        assert_eq!(q, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_quantiles_all_nan_is_none() {
        assert!(quantiles(&[f64::NAN, f64::NAN], &[0.5]).is_none());
        assert!(median(&[]).is_none());
    }

    #[test]
    fn test_median_even_count() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_single_value() {
        assert_eq!(quantile_sorted(&[7.0], 0.9), 7.0);
    }
}
