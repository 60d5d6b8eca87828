//! Fluent builder for pipeline configuration.
//!
//! A thin layer over [`PipelineConfig`] for callers assembling a run in
//! code rather than from a TOML file. Every setter has a config-file
//! equivalent; the builder only adds chaining and a final validation.
//!
//! # Example
//!
//! ```
//! use crypto_feature_pipeline::PipelineBuilder;
//!
//! let pipeline = PipelineBuilder::new()
//!     .ohlcv("data/ohlcv.csv")
//!     .benchmark_ticker("BTC")
//!     .correlation_threshold(0.3)
//!     .horizons(vec![1, 7])
//!     .build()
//!     .unwrap();
//! assert_eq!(pipeline.config().selection.threshold, 0.3);
//! ```

use std::path::PathBuf;

use crate::config::{
    DataConfig, ExperimentMetadata, PipelineConfig, ScalerConfig,
};
use crate::error::{PipelineError, Result};
use crate::features::IndicatorConfig;
use crate::fuzzy::{FamilyAssignment, FuzzyConfig, MembershipFamily};
use crate::labeling::LabelConfig;
use crate::model::{SearchConfig, SoftmaxParams};
use crate::pipeline::Pipeline;
use crate::preprocessing::ConstantColumnPolicy;
use crate::schema::FeatureGroup;
use crate::selection::SelectionConfig;

/// Fluent builder for creating pipeline configurations.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    data: DataConfig,
    indicators: IndicatorConfig,
    selection: SelectionConfig,
    fuzzy: FuzzyConfig,
    labels: LabelConfig,
    scaler: ScalerConfig,
    search: SearchConfig,
    metadata: Option<ExperimentMetadata>,
}

impl PipelineBuilder {
    /// A builder preloaded with the default configuration: the built-in
    /// feature groups, horizons 1/7/30, and the default search grid.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Path of the OHLCV CSV.
    pub fn ohlcv(mut self, path: impl Into<PathBuf>) -> Self {
        self.data.ohlcv = path.into();
        self
    }

    /// Path of the daily sentiment CSV. Without it the macro feature block
    /// is absent and the macro group goes unresolved.
    pub fn sentiment(mut self, path: impl Into<PathBuf>) -> Self {
        self.data.sentiment = Some(path.into());
        self
    }

    /// Directory run artifacts are written to.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data.output_dir = path.into();
        self
    }

    /// Ticker anchoring the benchmark-relative quality features.
    pub fn benchmark_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.indicators = self.indicators.with_benchmark_ticker(ticker);
        self
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Max absolute correlation a candidate may have against the already
    /// selected features.
    pub fn correlation_threshold(mut self, threshold: f64) -> Self {
        self.selection.threshold = threshold;
        self
    }

    /// Replace the built-in feature groups.
    pub fn groups(mut self, groups: Vec<FeatureGroup>) -> Self {
        self.selection.groups = groups;
        self
    }

    /// Exclude a feature from selection everywhere.
    pub fn exclude(mut self, feature: impl Into<String>) -> Self {
        self.selection.excluded.push(feature.into());
        self
    }

    /// Rescue one group by forcing a feature past the threshold when the
    /// group would otherwise resolve to nothing.
    pub fn forced_keep(mut self, group: impl Into<String>, feature: impl Into<String>) -> Self {
        self.selection = self.selection.with_forced_keep(group, feature);
        self
    }

    // =========================================================================
    // Fuzzification
    // =========================================================================

    /// Bind a group to a membership family, replacing any existing binding.
    pub fn assign_family(mut self, group: impl Into<String>, family: MembershipFamily) -> Self {
        let group = group.into();
        match self.fuzzy.assignments.iter_mut().find(|a| a.group == group) {
            Some(assignment) => assignment.family = family,
            None => self.fuzzy.assignments.push(FamilyAssignment { group, family }),
        }
        self
    }

    // =========================================================================
    // Labels and scaling
    // =========================================================================

    /// Forward-return horizons, in trading days.
    pub fn horizons(mut self, horizons: Vec<usize>) -> Self {
        self.labels.horizons = horizons;
        self
    }

    /// Fraction of labeled rows assigned to training.
    pub fn train_fraction(mut self, fraction: f64) -> Self {
        self.labels.train_fraction = fraction;
        self
    }

    /// What the scaler does with a column that is constant over the
    /// training rows.
    pub fn scaler_policy(mut self, policy: ConstantColumnPolicy) -> Self {
        self.scaler.constant_columns = policy;
        self
    }

    // =========================================================================
    // Model search
    // =========================================================================

    /// Replace the whole search configuration.
    pub fn search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Replace the candidate grid, keeping the fold settings.
    pub fn candidates(mut self, candidates: Vec<SoftmaxParams>) -> Self {
        self.search.candidates = candidates;
        self
    }

    /// Number of purged cross-validation folds.
    pub fn cv_splits(mut self, n_splits: usize) -> Self {
        self.search.n_splits = n_splits;
        self
    }

    /// Gradient rounds without validation improvement before a fit stops.
    pub fn early_stopping(mut self, rounds: usize) -> Self {
        self.search.early_stopping_rounds = rounds;
        self
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Tag the run with a name and description for artifact provenance.
    pub fn experiment(mut self, name: &str, description: &str) -> Self {
        self.metadata = Some(ExperimentMetadata {
            name: name.to_string(),
            description: Some(description.to_string()),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            tags: Vec::new(),
        });
        self
    }

    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// One-line description of the configured run.
    pub fn summary(&self) -> String {
        format!(
            "PipelineBuilder Summary:\n\
             - OHLCV: {}\n\
             - Benchmark: {}\n\
             - Groups: {} (threshold {})\n\
             - Horizons: {:?}\n\
             - Train fraction: {}\n\
             - Search: {} candidates over {} folds",
            self.data.ohlcv.display(),
            self.indicators.benchmark_ticker,
            self.selection.groups.len(),
            self.selection.threshold,
            self.labels.horizons,
            self.labels.train_fraction,
            self.search.candidates.len(),
            self.search.n_splits,
        )
    }

    /// Assemble and validate the configuration.
    pub fn build_config(self) -> std::result::Result<PipelineConfig, String> {
        let config = PipelineConfig {
            data: self.data,
            indicators: self.indicators,
            selection: self.selection,
            fuzzy: self.fuzzy,
            labels: self.labels,
            scaler: self.scaler,
            search: self.search,
            metadata: self.metadata,
        };
        config.validate()?;
        Ok(config)
    }

    /// Assemble, validate, and wrap in a ready-to-run [`Pipeline`].
    pub fn build(self) -> Result<Pipeline> {
        let config = self.build_config().map_err(PipelineError::config)?;
        Pipeline::from_config(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
