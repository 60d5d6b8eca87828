//! Pipeline configuration management.
//!
//! This module provides unified configuration for the entire feature and
//! dataset pipeline, with serialization support for experiment
//! reproducibility.
//!
//! # Features
//!
//! - **Unified Configuration**: Single struct combining all pipeline stages
//! - **Serialization**: Save/load configurations to TOML or JSON
//! - **Validation**: Per-stage checks plus cross-stage consistency
//! - **Reproducibility**: Version control friendly configuration files
//!
//! # Example
//!
//! ```
//! use crypto_feature_pipeline::config::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! assert!(config.validate().is_ok());
//!
//! // Stage settings are plain fields, adjustable before a run.
//! let config = config.with_horizons(vec![1, 7]);
//! assert_eq!(config.labels.horizons, vec![1, 7]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::features::IndicatorConfig;
use crate::fuzzy::FuzzyConfig;
use crate::labeling::LabelConfig;
use crate::model::SearchConfig;
use crate::preprocessing::ConstantColumnPolicy;
use crate::selection::SelectionConfig;

/// Unified pipeline configuration.
///
/// Contains all parameters for the complete run: indicator computation,
/// correlation selection, fuzzy encoding, labeling, scaling, and the
/// hyperparameter search. Every section has serde defaults, so a partial
/// TOML file overriding one field is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input/output locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Indicator computation settings.
    #[serde(default)]
    pub indicators: IndicatorConfig,

    /// Correlation-constrained feature selection.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Group-to-membership-family bindings.
    #[serde(default)]
    pub fuzzy: FuzzyConfig,

    /// Horizons and the train/test split.
    #[serde(default)]
    pub labels: LabelConfig,

    /// Scaling behavior.
    #[serde(default)]
    pub scaler: ScalerConfig,

    /// Hyperparameter search grid and folds.
    #[serde(default)]
    pub search: SearchConfig,

    /// Experiment metadata (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

/// Input and output locations for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Daily OHLCV table, long format keyed by (Date, Ticker).
    pub ohlcv: PathBuf,

    /// Optional daily sentiment index table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<PathBuf>,

    /// Directory all artifacts are written under.
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            ohlcv: PathBuf::from("data/ohlcv.csv"),
            sentiment: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl DataConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.ohlcv.as_os_str().is_empty() {
            return Err("ohlcv path must not be empty".to_string());
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err("output_dir must not be empty".to_string());
        }
        Ok(())
    }
}

/// Scaling stage settings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScalerConfig {
    /// What to do when a training column has no range.
    #[serde(default)]
    pub constant_columns: ConstantColumnPolicy,
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name.
    pub name: String,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp, left to the author's convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Custom tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            indicators: IndicatorConfig::default(),
            selection: SelectionConfig::default(),
            fuzzy: FuzzyConfig::default(),
            labels: LabelConfig::default(),
            scaler: ScalerConfig::default(),
            search: SearchConfig::default(),
            metadata: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set experiment metadata.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the selection stage configuration.
    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Set the fuzzy stage configuration.
    pub fn with_fuzzy(mut self, fuzzy: FuzzyConfig) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    /// Replace the label horizons.
    pub fn with_horizons(mut self, horizons: Vec<usize>) -> Self {
        self.labels.horizons = horizons;
        self
    }

    /// Set the constant-column policy of the scaler.
    pub fn with_scaler_policy(mut self, policy: ConstantColumnPolicy) -> Self {
        self.scaler.constant_columns = policy;
        self
    }

    /// Set the hyperparameter search configuration.
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Validate every stage, then cross-stage consistency.
    ///
    /// The cross checks catch configurations that would only fail deep
    /// inside a run: fuzzy assignments naming groups the selector does not
    /// know, and a forced-keep rule targeting a nonexistent group.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.data.validate()?;
        self.indicators.validate()?;
        self.selection.validate()?;
        self.fuzzy.validate()?;
        self.labels.validate()?;
        self.search.validate()?;

        let group_names: Vec<&str> = self
            .selection
            .groups
            .iter()
            .map(|g| g.name.as_str())
            .collect();

        for assignment in &self.fuzzy.assignments {
            if !group_names.contains(&assignment.group.as_str()) {
                return Err(format!(
                    "fuzzy assignment references unknown group '{}' (known: {})",
                    assignment.group,
                    group_names.join(", ")
                ));
            }
        }

        if let Some(forced) = &self.selection.forced_keep {
            if !group_names.contains(&forced.group.as_str()) {
                return Err(format!(
                    "forced_keep references unknown group '{}'",
                    forced.group
                ));
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| PipelineError::config(format!("cannot serialize config: {e}")))?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = toml::from_str(&contents).map_err(|e| {
            PipelineError::config(format!(
                "invalid config {}: {e}",
                path.as_ref().display()
            ))
        })?;
        config.validate().map_err(PipelineError::config)?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::config(format!("cannot serialize config: {e}")))?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&contents).map_err(|e| {
            PipelineError::config(format!(
                "invalid config {}: {e}",
                path.as_ref().display()
            ))
        })?;
        config.validate().map_err(PipelineError::config)?;
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionConfig;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_load_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");

        let config = PipelineConfig::default()
            .with_horizons(vec![1, 7])
            .with_metadata(ExperimentMetadata {
                name: "smoke".to_string(),
                description: Some("round trip".to_string()),
                created_at: None,
                tags: vec!["test".to_string()],
            });
        config.save_toml(&path).unwrap();

        let loaded = PipelineConfig::load_toml(&path).unwrap();
        assert_eq!(loaded.labels.horizons, vec![1, 7]);
        assert_eq!(loaded.selection.threshold, config.selection.threshold);
        assert_eq!(loaded.metadata.unwrap().name, "smoke");
    }

    #[test]
    fn test_save_load_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");

        let config = PipelineConfig::default();
        config.save_json(&path).unwrap();

        let loaded = PipelineConfig::load_json(&path).unwrap();
        assert_eq!(
            loaded.indicators.benchmark_ticker,
            config.indicators.benchmark_ticker
        );
        assert_eq!(loaded.search.candidates.len(), config.search.candidates.len());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "[selection]\nthreshold = 0.4\n").unwrap();

        let loaded = PipelineConfig::load_toml(&path).unwrap();
        assert_eq!(loaded.selection.threshold, 0.4);
        assert_eq!(loaded.labels.horizons, vec![1, 7, 30]);
        assert_eq!(loaded.selection.groups.len(), 5);
    }

    #[test]
    fn test_fuzzy_assignment_must_name_known_group() {
        let mut config = PipelineConfig::default();
        config.fuzzy.assignments[0].group = "momentum".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.contains("unknown group 'momentum'"));
    }

    #[test]
    fn test_forced_keep_must_name_known_group() {
        let mut config = PipelineConfig::default();
        config.selection = SelectionConfig::default().with_forced_keep("sentiment", "fgi");
        assert!(config.validate().is_err());

        config.selection = SelectionConfig::default().with_forced_keep("macro", "fgi");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_stage_rejected() {
        let mut config = PipelineConfig::default();
        config.indicators.benchmark_ticker = String::new();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.labels.horizons = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_toml_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[labels]\nhorizons = []\n").unwrap();

        let err = PipelineConfig::load_toml(&path).unwrap_err();
        assert!(err.is_fatal());
    }
}
