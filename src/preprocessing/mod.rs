//! Preprocessing applied between labeling and model training.
//!
//! Two concerns live here:
//!
//! - **Quantile estimation**: the single interpolation rule shared by every
//!   quantile-derived parameter in the pipeline (fuzzy anchors, tertile label
//!   cutoffs, rolling CVaR thresholds)
//!
//! - **Scaling**: leakage-safe min-max normalization
//!   - Bounds fitted on training rows only
//!   - Stored bounds applied verbatim to test rows (no refit, no clipping)
//!   - Missing values resolved by per-ticker forward fill, then zero
//!
//! # Example
//!
//! ```ignore
//! use crypto_feature_pipeline::preprocessing::{forward_fill_columns, MinMaxScaler};
//!
//! forward_fill_columns(&mut unit_matrix, &feature_columns)?;
//! let train = unit_matrix.slice_rows(0..split_index)?;
//!
//! let scaler = MinMaxScaler::default();
//! let state = scaler.fit(&train, &feature_columns)?;
//! let scaled = scaler.transform(&state, &unit_matrix)?;
//! ```

pub mod quantile;
pub mod scaler;

// Re-export commonly used types for convenience
pub use quantile::{median, quantile_sorted, quantiles, valid_sorted};
pub use scaler::{forward_fill_columns, ConstantColumnPolicy, MinMaxScaler, ScalerState};
