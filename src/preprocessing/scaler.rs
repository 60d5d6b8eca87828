//! Leakage-safe min-max scaling.
//!
//! # Strategy
//!
//! ```text
//! normalized = (x - train_min) / (train_max - train_min)
//! ```
//!
//! [`MinMaxScaler::fit`] sees only training rows; [`MinMaxScaler::transform`]
//! applies the stored bounds verbatim, so test values beyond the training
//! range map outside [0, 1]. That is intentional: clipping would hide regime
//! shifts from the classifier, and refitting on test rows would leak future
//! information into the transform.
//!
//! Missing values are resolved before fitting by [`forward_fill_columns`]:
//! forward-fill within each ticker block, then zero for anything still
//! missing at the head of a series.
//!
//! Constant columns have no usable range. The policy is configurable:
//! [`ConstantColumnPolicy::EmitZero`] (default) maps every value of such a
//! column to 0.0 and logs a warning; [`ConstantColumnPolicy::Fail`] turns it
//! into [`PipelineError::DegenerateColumn`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::frame::FeatureMatrix;

/// What to do when a fitted column has `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConstantColumnPolicy {
    /// Emit 0.0 for every value of the degenerate column and log a warning.
    #[default]
    EmitZero,
    /// Fail the unit with [`PipelineError::DegenerateColumn`].
    Fail,
}

/// Per-column (min, max) bounds captured from training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    columns: Vec<String>,
    bounds: Vec<(f64, f64)>,
}

impl ScalerState {
    /// Columns the state was fitted on, in fit order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Stored (min, max) for a column, if it was fitted.
    pub fn bounds_for(&self, column: &str) -> Option<(f64, f64)> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.bounds[i])
    }
}

/// Min-max scaler with train-only fitting.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinMaxScaler {
    policy: ConstantColumnPolicy,
}

impl MinMaxScaler {
    pub fn new(policy: ConstantColumnPolicy) -> Self {
        Self { policy }
    }

    /// Captures per-column bounds from `train` rows only.
    ///
    /// The matrix is expected to be missing-free for the listed columns
    /// (run [`forward_fill_columns`] first); any `NaN` that still remains is
    /// ignored when computing bounds.
    pub fn fit(&self, train: &FeatureMatrix, columns: &[String]) -> Result<ScalerState> {
        if train.is_empty() {
            return Err(PipelineError::config("cannot fit scaler on an empty matrix"));
        }
        let mut bounds = Vec::with_capacity(columns.len());
        for name in columns {
            let values = train.column(name).ok_or_else(|| {
                PipelineError::config(format!("scaler fit references missing column '{name}'"))
            })?;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &v in values {
                if v.is_nan() {
                    continue;
                }
                min = min.min(v);
                max = max.max(v);
            }
            if min > max {
                return Err(PipelineError::config(format!(
                    "column '{name}' has no finite training values to fit"
                )));
            }
            if min == max {
                match self.policy {
                    ConstantColumnPolicy::Fail => {
                        return Err(PipelineError::DegenerateColumn {
                            column: name.clone(),
                        });
                    }
                    ConstantColumnPolicy::EmitZero => {
                        warn!(column = %name, value = min, "constant column; scaled output will be 0.0");
                    }
                }
            }
            bounds.push((min, max));
        }
        Ok(ScalerState {
            columns: columns.to_vec(),
            bounds,
        })
    }

    /// Applies stored bounds to every fitted column of `matrix`, returning a
    /// new matrix with the same row keys. Never refits.
    pub fn transform(&self, state: &ScalerState, matrix: &FeatureMatrix) -> Result<FeatureMatrix> {
        let mut out = FeatureMatrix::from_keys(matrix.dates().to_vec(), matrix.tickers().to_vec())?;
        for (name, &(min, max)) in state.columns.iter().zip(&state.bounds) {
            let values = matrix.column(name).ok_or_else(|| {
                PipelineError::config(format!(
                    "scaler transform references missing column '{name}'"
                ))
            })?;
            let range = max - min;
            let scaled: Vec<f64> = if range == 0.0 {
                vec![0.0; values.len()]
            } else {
                values.iter().map(|&v| (v - min) / range).collect()
            };
            out.push_column(name.clone(), scaled)?;
        }
        Ok(out)
    }
}

/// Forward-fills each listed column within every ticker block, then replaces
/// any remaining missing value (a run of `NaN` at the head of a block) with 0.
pub fn forward_fill_columns(matrix: &mut FeatureMatrix, columns: &[String]) -> Result<()> {
    let spans: Vec<std::ops::Range<usize>> = matrix
        .ticker_spans()
        .into_iter()
        .map(|(_, range)| range)
        .collect();
    for name in columns {
        let values = matrix.column_mut(name).ok_or_else(|| {
            PipelineError::config(format!("forward fill references missing column '{name}'"))
        })?;
        for span in &spans {
            let mut last = f64::NAN;
            for i in span.clone() {
                if values[i].is_nan() {
                    values[i] = if last.is_nan() { 0.0 } else { last };
                } else {
                    last = values[i];
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn matrix_with(values: Vec<f64>) -> FeatureMatrix {
        let n = values.len();
        let dates: Vec<NaiveDate> = (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64))
            .collect();
        let tickers = vec!["BTC".to_string(); n];
        let mut m = FeatureMatrix::from_keys(dates, tickers).unwrap();
        m.push_column("x", values).unwrap();
        m
    }

    #[test]
    fn test_fit_transform_scales_to_unit_interval() {
        let train = matrix_with(vec![0.0, 5.0, 10.0]);
        let scaler = MinMaxScaler::default();
        let state = scaler.fit(&train, &["x".to_string()]).unwrap();
        let scaled = scaler.transform(&state, &train).unwrap();
        assert_eq!(scaled.column("x").unwrap(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_transform_does_not_clip_out_of_range() {
        let train = matrix_with(vec![0.0, 10.0]);
        let scaler = MinMaxScaler::default();
        let state = scaler.fit(&train, &["x".to_string()]).unwrap();

        let test = matrix_with(vec![20.0, -10.0]);
        let scaled = scaler.transform(&state, &test).unwrap();
        assert_eq!(scaled.column("x").unwrap(), &[2.0, -1.0]);
    }

    #[test]
    fn test_constant_column_emits_zero_by_default() {
        let train = matrix_with(vec![3.0, 3.0, 3.0]);
        let scaler = MinMaxScaler::default();
        let state = scaler.fit(&train, &["x".to_string()]).unwrap();
        let scaled = scaler.transform(&state, &train).unwrap();
        assert_eq!(scaled.column("x").unwrap(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_constant_column_fail_policy() {
        let train = matrix_with(vec![3.0, 3.0]);
        let scaler = MinMaxScaler::new(ConstantColumnPolicy::Fail);
        let err = scaler.fit(&train, &["x".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateColumn { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_forward_fill_within_ticker_blocks() {
        let d = |n: u32| NaiveDate::from_ymd_opt(2024, 1, n).unwrap();
        let mut m = FeatureMatrix::from_keys(
            vec![d(1), d(2), d(3), d(1), d(2)],
            vec![
                "BTC".into(),
                "BTC".into(),
                "BTC".into(),
                "ETH".into(),
                "ETH".into(),
            ],
        )
        .unwrap();
        m.push_column("x", vec![1.0, f64::NAN, f64::NAN, f64::NAN, 7.0])
            .unwrap();
        forward_fill_columns(&mut m, &["x".to_string()]).unwrap();
        // BTC's trailing NaNs take the last BTC value; ETH's leading NaN must
        // not borrow from BTC and falls back to 0.
        assert_eq!(m.column("x").unwrap(), &[1.0, 1.0, 1.0, 0.0, 7.0]);
    }

    #[test]
    fn test_state_round_trips_through_serde() {
        let train = matrix_with(vec![1.0, 2.0]);
        let state = MinMaxScaler::default()
            .fit(&train, &["x".to_string()])
            .unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let back: ScalerState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
        assert_eq!(back.bounds_for("x"), Some((1.0, 2.0)));
    }
}
