//! Crypto Feature Pipeline
//!
//! Daily-bar feature engineering and model selection for crypto trend
//! classification.
//!
//! # Overview
//!
//! This library turns long-format OHLCV history (plus an optional daily
//! sentiment index) into per-ticker trend classifiers. One run:
//!
//! - computes the indicator table over every ticker,
//! - picks one low-correlation representative per feature group,
//! - derives a fuzzy membership table from the representatives,
//! - and for each (ticker, horizon, representation) unit labels forward
//!   returns into tertiles, scales on the train rows, searches the softmax
//!   grid under purged cross-validation, and scores the fit against
//!   majority-class and persistence baselines.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Crypto Feature Pipeline                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  schema/        - Input loading and feature group definitions   │
//! │  features/      - Indicator columns over OHLCV and sentiment    │
//! │  selection/     - Correlation-constrained representatives       │
//! │  fuzzy/         - Quantile-anchored membership encoding         │
//! │  labeling/      - Forward-return tertiles and purged CV         │
//! │  preprocessing/ - Forward fill and train-fit min-max scaling    │
//! │  model/         - Softmax classifier, baselines, metrics        │
//! │  pipeline/      - Per-unit orchestration; batch/ runs it wide   │
//! │  export/        - CSV and JSON run artifacts                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use crypto_feature_pipeline::prelude::*;
//!
//! let series = load_ohlcv("data/ohlcv.csv")?;
//! let sentiment = load_sentiment("data/fgi.csv")?;
//!
//! let pipeline = PipelineBuilder::new()
//!     .horizons(vec![1, 7, 30])
//!     .build()?;
//! let output = pipeline.run(&series, Some(&sentiment))?;
//!
//! for report in &output.reports {
//!     println!("{}: macro-F1 {:.3}", report.id, report.model.macro_f1);
//! }
//! ```

pub mod batch;
pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod frame;
pub mod fuzzy;
pub mod labeling;
pub mod model;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod schema;
pub mod selection;

// Re-exports - Error handling
pub use error::{PipelineError, Result};

// Re-exports - Config
pub use builder::PipelineBuilder;
pub use config::{DataConfig, ExperimentMetadata, PipelineConfig, ScalerConfig};

// Re-exports - Data model
pub use frame::{FeatureMatrix, DATE_COLUMN, TICKER_COLUMN};
pub use schema::{
    default_groups, load_ohlcv, load_sentiment, FeatureGroup, OhlcvSeries, SentimentSeries,
};

// Re-exports - Indicators
pub use features::{IndicatorConfig, IndicatorEngine};

// Re-exports - Selection
pub use selection::{select_features, SelectionConfig, SelectionResult};

// Re-exports - Fuzzification
pub use fuzzy::{FamilyAssignment, FuzzyConfig, MembershipFamily, MembershipSet};

// Re-exports - Labeling
pub use labeling::{build_labels, LabelConfig, LabeledUnit, TertileCutoffs, TrendClass};

// Re-exports - Preprocessing
pub use preprocessing::{ConstantColumnPolicy, MinMaxScaler, ScalerState};

// Re-exports - Model
pub use model::{
    Classifier, EvaluationReport, SearchConfig, SearchOutcome, SoftmaxClassifier, SoftmaxParams,
};

// Re-exports - Export
pub use export::RunExporter;

// Re-exports - Pipeline
pub use pipeline::{Pipeline, Representation, RunOutput, UnitData, UnitId, UnitReport};

// Re-exports - Batch
pub use batch::{BatchConfig, BatchOutput, BatchRunner, CancellationToken, ErrorMode};
