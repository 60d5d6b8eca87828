//! Label generation and chronological splitting for return classification.
//!
//! Converts a close-price series into three-way class targets over a fixed
//! horizon, with the train/test boundary and every derived statistic placed
//! so that nothing computed on test rows can influence training.
//!
//! # Overview
//!
//! For each (ticker, horizon) unit of work:
//!
//! ```text
//! r(t, h) = close(t + h) / close(t) - 1        // forward return at row t
//! ```
//!
//! Tail rows where `r` is undefined are dropped, the remainder is split
//! chronologically at `floor(train_fraction * n)`, and class boundaries are
//! the tertiles of the *train* forward returns only:
//!
//! ```text
//! class 0 (Down):  r <= q1/3
//! class 1 (Flat):  q1/3 < r <= q2/3
//! class 2 (Up):    r > q2/3
//! ```
//!
//! The outer edges are treated as unbounded, so test returns beyond the
//! train range still classify. Cutoffs are fitted once and applied
//! unchanged to test rows.
//!
//! # Cross-validation
//!
//! [`PurgedTimeSeriesSplit`] provides expanding-window folds with a purge
//! gap: because the label at row t is computed from prices up to t + h,
//! the last h training rows before a validation block would leak label
//! information, so they are removed.

pub mod purged_cv;
pub mod splits;

pub use purged_cv::{Fold, PurgedTimeSeriesSplit};
pub use splits::{build_labels, forward_return, past_return, LabeledUnit, TertileCutoffs};

use serde::{Deserialize, Serialize};

// ============================================================================
// Core Types
// ============================================================================

/// Return-tertile class for one row.
///
/// # Example
///
/// ```
/// use crypto_feature_pipeline::labeling::TrendClass;
///
/// assert_eq!(TrendClass::Up.as_index(), 2);
/// assert_eq!(TrendClass::from_index(0), Some(TrendClass::Down));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendClass {
    /// Forward return in the bottom tertile of the train distribution.
    Down = 0,
    /// Forward return in the middle tertile.
    Flat = 1,
    /// Forward return in the top tertile.
    Up = 2,
}

impl TrendClass {
    pub const COUNT: usize = 3;

    /// Class index as used by the classifier layer.
    #[inline]
    pub fn as_index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(TrendClass::Down),
            1 => Some(TrendClass::Flat),
            2 => Some(TrendClass::Up),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrendClass::Down => "Down",
            TrendClass::Flat => "Flat",
            TrendClass::Up => "Up",
        }
    }
}

impl std::fmt::Display for TrendClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Configuration for label generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Forward horizons, in rows, one (ticker, horizon) unit each.
    #[serde(default = "default_horizons")]
    pub horizons: Vec<usize>,

    /// Fraction of labeled rows assigned to train; the boundary row index
    /// is `floor(train_fraction * n)`.
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,
}

fn default_horizons() -> Vec<usize> {
    vec![1, 7, 30]
}

fn default_train_fraction() -> f64 {
    0.8
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            horizons: default_horizons(),
            train_fraction: default_train_fraction(),
        }
    }
}

impl LabelConfig {
    pub fn with_horizons(mut self, horizons: Vec<usize>) -> Self {
        self.horizons = horizons;
        self
    }

    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.horizons.is_empty() {
            return Err("at least one horizon is required".to_string());
        }
        if self.horizons.iter().any(|&h| h == 0) {
            return Err("horizons must be >= 1".to_string());
        }
        for (i, h) in self.horizons.iter().enumerate() {
            if self.horizons[..i].contains(h) {
                return Err(format!("horizon {h} listed twice"));
            }
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(format!(
                "train_fraction must be in (0, 1), got {}",
                self.train_fraction
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_index_round_trip() {
        for class in [TrendClass::Down, TrendClass::Flat, TrendClass::Up] {
            assert_eq!(TrendClass::from_index(class.as_index()), Some(class));
        }
        assert_eq!(TrendClass::from_index(3), None);
    }

    #[test]
    fn test_class_display() {
        assert_eq!(format!("{}", TrendClass::Down), "Down");
        assert_eq!(format!("{}", TrendClass::Up), "Up");
    }

    #[test]
    fn test_default_config() {
        let config = LabelConfig::default();
        assert_eq!(config.horizons, vec![1, 7, 30]);
        assert_eq!(config.train_fraction, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(LabelConfig::default()
            .with_horizons(vec![])
            .validate()
            .is_err());
        assert!(LabelConfig::default()
            .with_horizons(vec![0])
            .validate()
            .is_err());
        assert!(LabelConfig::default()
            .with_horizons(vec![7, 7])
            .validate()
            .is_err());
        assert!(LabelConfig::default()
            .with_train_fraction(1.0)
            .validate()
            .is_err());
        assert!(LabelConfig::default()
            .with_train_fraction(0.5)
            .validate()
            .is_ok());
    }
}
