//! Prelude module for convenient imports.
//!
//! Re-exports the types most runs touch, so a binary or notebook-style
//! experiment can start from a single `use`.
//!
//! # Usage
//!
//! ```ignore
//! use crypto_feature_pipeline::prelude::*;
//!
//! let pipeline = PipelineBuilder::new()
//!     .ohlcv("data/ohlcv.csv")
//!     .sentiment("data/fgi.csv")
//!     .build()?;
//! let output = pipeline.run(&series, Some(&sentiment))?;
//! ```
//!
//! # What's Included
//!
//! ## Core Pipeline
//! - [`Pipeline`] - End-to-end orchestration over one dataset
//! - [`PipelineBuilder`] - Fluent configuration
//! - [`PipelineConfig`] - The full run configuration
//! - [`RunOutput`] - Per-unit reports plus skips
//!
//! ## Data Model
//! - [`FeatureMatrix`] - Column-major (Date, Ticker)-keyed table
//! - [`OhlcvSeries`] / [`SentimentSeries`] - Loaded inputs
//!
//! ## Stages
//! - [`IndicatorEngine`] - Raw series to indicator columns
//! - [`SelectionResult`] - Correlation-constrained representative picks
//! - [`MembershipSet`] - Fuzzy state columns for one feature
//! - [`LabeledUnit`] - Forward-return tertile labels and the time split
//! - [`MinMaxScaler`] - Train-fit [0, 1] scaling
//! - [`SoftmaxClassifier`] - Multinomial model with the search grid
//!
//! ## Batch
//! - [`BatchRunner`] - Parallel unit execution with cancellation

// ============================================================================
// Core Pipeline
// ============================================================================

pub use crate::builder::PipelineBuilder;
pub use crate::config::{DataConfig, ExperimentMetadata, PipelineConfig, ScalerConfig};
pub use crate::pipeline::{
    Pipeline, PreparedData, Representation, RunOutput, SkippedUnit, UnitData, UnitId, UnitReport,
};

// ============================================================================
// Data Model
// ============================================================================

pub use crate::frame::{FeatureMatrix, DATE_COLUMN, TICKER_COLUMN};
pub use crate::schema::{
    default_groups, load_ohlcv, load_sentiment, FeatureGroup, OhlcvSeries, SentimentSeries,
};

// ============================================================================
// Indicators
// ============================================================================

pub use crate::features::{IndicatorConfig, IndicatorEngine};

// ============================================================================
// Selection
// ============================================================================

pub use crate::selection::{
    select_features, ForcedKeep, GroupSelection, SelectionConfig, SelectionResult,
    DEFAULT_CORRELATION_THRESHOLD,
};

// ============================================================================
// Fuzzification
// ============================================================================

pub use crate::fuzzy::{FamilyAssignment, FuzzyConfig, MembershipFamily, MembershipSet};

// ============================================================================
// Labeling
// ============================================================================

pub use crate::labeling::{
    build_labels, forward_return, LabelConfig, LabeledUnit, PurgedTimeSeriesSplit, TertileCutoffs,
    TrendClass,
};

// ============================================================================
// Preprocessing
// ============================================================================

pub use crate::preprocessing::{
    forward_fill_columns, ConstantColumnPolicy, MinMaxScaler, ScalerState,
};

// ============================================================================
// Model
// ============================================================================

pub use crate::model::{
    evaluate_predictions, search_hyperparameters, sorted_importances, Classifier,
    EvaluationReport, MajorityClassifier, SearchConfig, SearchOutcome, SoftmaxClassifier,
    SoftmaxParams,
};

// ============================================================================
// Export
// ============================================================================

pub use crate::export::{
    read_labeled_table, read_matrix, write_json, write_labeled_tables, write_matrix, RunExporter,
};

// ============================================================================
// Batch Processing
// ============================================================================

pub use crate::batch::{
    BatchConfig, BatchOutput, BatchRunner, CancellationToken, ConsoleProgress, ErrorMode,
    ProgressCallback, ProgressInfo, UnitOutcome,
};

// ============================================================================
// Error Handling
// ============================================================================

pub use crate::error::{PipelineError, Result};
