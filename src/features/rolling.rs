//! Rolling-window kernels shared by the indicator library.
//!
//! # Overview
//!
//! Every indicator reduces to a handful of window kernels over a single
//! ticker's daily series. They all follow one missing-value convention:
//! a window result is defined only when the window is complete (the first
//! `window - 1` positions are `NaN`) and every value in it is finite;
//! otherwise the output at that position is `NaN`. Kernels that need a
//! different rule (exponential means, drawdown duration, hit ratios) document
//! it on the function.
//!
//! Windows here are small (7 to 180 rows) over daily history, so kernels
//! recompute per position instead of maintaining incremental state.

use crate::preprocessing::quantile::{quantile_sorted, valid_sorted};

/// Guard for denominators that may collapse to zero.
pub const EPSILON: f64 = 1e-12;

/// Division that yields `NaN` instead of infinities on a collapsed denominator.
#[inline]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < EPSILON {
        f64::NAN
    } else {
        numerator / denominator
    }
}

#[inline]
fn complete_window(values: &[f64], i: usize, window: usize) -> Option<&[f64]> {
    if window == 0 || i + 1 < window {
        return None;
    }
    Some(&values[i + 1 - window..=i])
}

#[inline]
fn all_finite(window: &[f64]) -> bool {
    window.iter().all(|v| !v.is_nan())
}

/// Applies `f` to every complete, fully-valid window.
pub fn rolling_apply<F>(values: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    (0..values.len())
        .map(|i| match complete_window(values, i, window) {
            Some(w) if all_finite(w) => f(w),
            _ => f64::NAN,
        })
        .collect()
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        w.iter().sum::<f64>() / w.len() as f64
    })
}

/// Rolling standard deviation with the given delta degrees of freedom
/// (0 for population, 1 for sample).
pub fn rolling_std(values: &[f64], window: usize, ddof: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| std_of(w, ddof))
}

pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().sum::<f64>())
}

fn std_of(window: &[f64], ddof: usize) -> f64 {
    let n = window.len();
    if n <= ddof {
        return f64::NAN;
    }
    let mean = window.iter().sum::<f64>() / n as f64;
    let ss: f64 = window.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (n - ddof) as f64).sqrt()
}

/// Percentage change over `periods` steps: `v[i] / v[i - periods] - 1`.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i < periods {
                f64::NAN
            } else {
                let prev = values[i - periods];
                let cur = values[i];
                if prev.is_nan() || cur.is_nan() {
                    f64::NAN
                } else {
                    safe_div(cur - prev, prev)
                }
            }
        })
        .collect()
}

/// Difference over `periods` steps: `v[i] - v[i - periods]`.
pub fn diff(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i < periods {
                f64::NAN
            } else {
                values[i] - values[i - periods]
            }
        })
        .collect()
}

/// Pulls future values backward: `out[i] = v[i + periods]`, `NaN` at the tail.
///
/// Used to align a forward return realized over `(t, t + h]` onto row `t`.
pub fn shift_back(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i + periods < values.len() {
                values[i + periods]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Recursive exponential moving mean parameterized by span:
/// `alpha = 2 / (span + 1)`.
pub fn ewm_mean_span(values: &[f64], span: usize) -> Vec<f64> {
    ewm_mean_alpha(values, 2.0 / (span as f64 + 1.0), 1)
}

/// Recursive exponential moving mean with explicit smoothing factor.
///
/// Seeds on the first finite value. A missing value keeps the previous mean
/// in the output and decays the accumulated weight, so the next finite value
/// carries proportionally more influence after a gap. Output is `NaN` until
/// `min_periods` finite values have been absorbed.
pub fn ewm_mean_alpha(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let decay = 1.0 - alpha;
    let mut out = vec![f64::NAN; values.len()];
    let mut avg = f64::NAN;
    let mut old_wt = 1.0;
    let mut observations = 0usize;

    for (i, &v) in values.iter().enumerate() {
        let valid = !v.is_nan();
        if valid {
            observations += 1;
        }
        if avg.is_nan() {
            if valid {
                avg = v;
            }
        } else {
            old_wt *= decay;
            if valid {
                if avg != v {
                    avg = (old_wt * avg + alpha * v) / (old_wt + alpha);
                }
                old_wt = 1.0;
            }
        }
        if observations >= min_periods && !avg.is_nan() {
            out[i] = avg;
        }
    }
    out
}

/// Rolling sample covariance (ddof = 1) between two aligned series.
pub fn rolling_cov(x: &[f64], y: &[f64], window: usize) -> Vec<f64> {
    paired_apply(x, y, window, |wx, wy| cov_of(wx, wy))
}

/// Rolling Pearson correlation between two aligned series.
pub fn rolling_corr(x: &[f64], y: &[f64], window: usize) -> Vec<f64> {
    paired_apply(x, y, window, |wx, wy| {
        let c = cov_of(wx, wy);
        safe_div(c, std_of(wx, 1) * std_of(wy, 1))
    })
}

/// Rolling sample variance (ddof = 1).
pub fn rolling_var(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        let s = std_of(w, 1);
        s * s
    })
}

fn paired_apply<F>(x: &[f64], y: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    debug_assert_eq!(x.len(), y.len());
    (0..x.len())
        .map(|i| {
            match (
                complete_window(x, i, window),
                complete_window(y, i, window),
            ) {
                (Some(wx), Some(wy)) if all_finite(wx) && all_finite(wy) => f(wx, wy),
                _ => f64::NAN,
            }
        })
        .collect()
}

fn cov_of(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let s: f64 = x
        .iter()
        .zip(y)
        .map(|(&a, &b)| (a - mx) * (b - my))
        .sum();
    s / (n - 1) as f64
}

/// Rolling least-squares slope of the series against 0..window-1.
///
/// Equivalent to fitting a line through each window and reporting its
/// per-step drift.
pub fn rolling_slope(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        let n = w.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = w.iter().sum::<f64>() / n;
        let mut num = 0.0;
        let mut den = 0.0;
        for (i, &y) in w.iter().enumerate() {
            let dx = i as f64 - mean_x;
            num += dx * (y - mean_y);
            den += dx * dx;
        }
        safe_div(num, den)
    })
}

/// Rolling bias-corrected sample skewness.
pub fn rolling_skew(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        let n = w.len();
        if n < 3 {
            return f64::NAN;
        }
        let nf = n as f64;
        let mean = w.iter().sum::<f64>() / nf;
        let m2: f64 = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nf;
        let m3: f64 = w.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / nf;
        if m2 < EPSILON {
            return f64::NAN;
        }
        let g1 = m3 / m2.powf(1.5);
        g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0)
    })
}

/// Rolling bias-corrected excess kurtosis.
pub fn rolling_kurt(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        let n = w.len();
        if n < 4 {
            return f64::NAN;
        }
        let nf = n as f64;
        let mean = w.iter().sum::<f64>() / nf;
        let s2: f64 = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (nf - 1.0);
        if s2 < EPSILON {
            return f64::NAN;
        }
        let m4: f64 = w.iter().map(|v| (v - mean).powi(4)).sum::<f64>();
        let a = nf * (nf + 1.0) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0));
        let b = 3.0 * (nf - 1.0) * (nf - 1.0) / ((nf - 2.0) * (nf - 3.0));
        a * m4 / (s2 * s2) - b
    })
}

/// Percentile rank (average rank of ties, in (0, 1]) of the window's last
/// value among the window.
pub fn rolling_rank_pct(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        let last = w[w.len() - 1];
        let mut less = 0usize;
        let mut equal = 0usize;
        for &v in w {
            if v < last {
                less += 1;
            } else if v == last {
                equal += 1;
            }
        }
        (less as f64 + (equal as f64 + 1.0) / 2.0) / w.len() as f64
    })
}

/// Rolling lag-1 autocorrelation; `NaN` when the window holds fewer than
/// `min_len` values.
pub fn rolling_autocorr(values: &[f64], window: usize, min_len: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        if w.len() < min_len {
            return f64::NAN;
        }
        let head = &w[..w.len() - 1];
        let tail = &w[1..];
        let c = cov_of(head, tail);
        safe_div(c, std_of(head, 1) * std_of(tail, 1))
    })
}

/// Rolling compound growth over a window of simple returns:
/// `prod(1 + r) - 1`.
pub fn rolling_compound_return(returns: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(returns, window, |w| {
        w.iter().map(|r| 1.0 + r).product::<f64>() - 1.0
    })
}

/// Rolling conditional value at risk: the mean of window values at or below
/// the `tail_prob` quantile of the window.
pub fn rolling_cvar(values: &[f64], window: usize, tail_prob: f64) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        let sorted = valid_sorted(w);
        let q = quantile_sorted(&sorted, tail_prob);
        let tail: Vec<f64> = w.iter().copied().filter(|&v| v <= q).collect();
        if tail.is_empty() {
            f64::NAN
        } else {
            tail.iter().sum::<f64>() / tail.len() as f64
        }
    })
}

/// Sample standard deviation of the strictly negative values in a window,
/// `NaN` when fewer than two exist. Used for downside volatility and the
/// Sortino denominator.
pub fn downside_std(window: &[f64]) -> f64 {
    let negatives: Vec<f64> = window.iter().copied().filter(|&v| v < 0.0).collect();
    if negatives.len() < 2 {
        return f64::NAN;
    }
    let n = negatives.len() as f64;
    let mean = negatives.iter().sum::<f64>() / n;
    let ss: f64 = negatives.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (n - 1.0)).sqrt()
}

/// True range per day: `max(H - L, |H - prev_C|, |L - prev_C|)`.
///
/// The first day has no previous close, so it falls back to the high-low range.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| {
            let hl = high[i] - low[i];
            if i == 0 || close[i - 1].is_nan() {
                return hl;
            }
            let prev = close[i - 1];
            hl.max((high[i] - prev).abs()).max((low[i] - prev).abs())
        })
        .collect()
}

/// Days elapsed since the running maximum was last touched.
///
/// 0 on a new high, `NaN` on missing prices. The running maximum ignores
/// missing values.
pub fn drawdown_duration(close: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; close.len()];
    let mut running_max = f64::NEG_INFINITY;
    let mut last_high: Option<usize> = None;
    for (i, &c) in close.iter().enumerate() {
        if c.is_nan() {
            continue;
        }
        if c >= running_max {
            running_max = c;
            last_high = Some(i);
        }
        if let Some(h) = last_high {
            out[i] = (i - h) as f64;
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
