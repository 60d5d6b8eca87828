//! Error types for the feature pipeline.
//!
//! Errors fall into two tiers. Schema errors ([`PipelineError::MissingRequiredColumn`],
//! [`PipelineError::Csv`], [`PipelineError::Io`]) mean the input tables themselves are
//! unusable and abort the run. Unit-scoped errors (insufficient data, unresolved groups,
//! degenerate columns) are caught at the (ticker, horizon) boundary by the batch runner,
//! logged with their diagnostics, and the unit is skipped.

use thiserror::Error;

/// Minimum valid observations required to derive quantile anchors.
pub const MIN_QUANTILE_OBSERVATIONS: usize = 10;

/// Minimum labeled rows required to build a train/test split.
pub const MIN_LABELED_ROWS: usize = 100;

/// Errors produced by the feature pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Fewer than 2 numeric candidate columns remain after filtering,
    /// so a pairwise correlation matrix cannot be formed.
    #[error("insufficient features for correlation selection: {available} numeric column(s) available, need at least 2")]
    InsufficientFeatures { available: usize },

    /// Too few valid observations to derive quantile-based membership parameters.
    #[error("insufficient data to fuzzify '{column}': {valid} valid observation(s), need at least {required}")]
    InsufficientData {
        column: String,
        valid: usize,
        required: usize,
    },

    /// Too few valid labeled rows to build a train/test split.
    #[error("insufficient history: {valid} labeled row(s) after dropping undefined forward returns, need at least {required}")]
    InsufficientHistory { valid: usize, required: usize },

    /// A column was constant over the fit window and the scaler is configured to fail.
    #[error("degenerate column '{column}': min == max over the training rows")]
    DegenerateColumn { column: String },

    /// A required identifier or price column is absent from an input table. Fatal.
    #[error("required column '{column}' missing from {table} table")]
    MissingRequiredColumn { column: String, table: String },

    /// Every candidate in a feature group violated the correlation threshold.
    /// Carries the candidate ranking (name, max |corr| vs selected) for diagnostics.
    #[error("no candidate in group '{group}' passed the correlation threshold; ranking: {ranking:?}")]
    UnresolvedGroup {
        group: String,
        ranking: Vec<(String, f64)>,
    },

    /// Invalid configuration detected before the pipeline ran.
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying I/O failure while reading or writing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited input or output failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    /// Constructs a configuration error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Config(msg.into())
    }

    /// True when the error should abort the whole run instead of skipping
    /// the current (ticker, horizon) unit. Schema, configuration, and I/O
    /// problems are fatal; data-quality problems scoped to one unit are not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PipelineError::InsufficientFeatures { .. }
                | PipelineError::InsufficientData { .. }
                | PipelineError::InsufficientHistory { .. }
                | PipelineError::DegenerateColumn { .. }
                | PipelineError::UnresolvedGroup { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
