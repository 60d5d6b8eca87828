//! Greedy low-correlation representative selection.
//!
//! Groups are visited in declared order. Within a group, every still-unused
//! candidate is scored by its largest |correlation| against the features
//! already selected, candidates are ranked ascending, and the first one at
//! or under the threshold wins. A group where every candidate exceeds the
//! threshold selects nothing and is reported with its full ranking.
//!
//! The scoring makes the first group trivial on purpose: with nothing
//! selected yet every candidate scores 0.0 and the stable sort preserves
//! declaration order, so the group's first available feature wins.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::FeatureMatrix;
use crate::schema::{default_groups, FeatureGroup, ALWAYS_EXCLUDED};

use super::correlation::CorrelationMatrix;

/// Default cap on |correlation| between any two selected features.
pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.25;

/// Score assigned to candidates absent from the correlation matrix.
/// Sorts after any real correlation and can never pass the threshold.
pub const MISSING_CORRELATION_SCORE: f64 = 999.0;

fn default_threshold() -> f64 {
    DEFAULT_CORRELATION_THRESHOLD
}

fn default_excluded() -> Vec<String> {
    ALWAYS_EXCLUDED.iter().map(|s| s.to_string()).collect()
}

/// Rescue rule for a single group: when `group` selects nothing, append
/// `feature` to the selection anyway (if present and not already selected).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedKeep {
    pub group: String,
    pub feature: String,
}

/// Configuration for the greedy selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Maximum |correlation| a candidate may have against the running
    /// selection and still be picked.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Groups to draw one representative from each, in priority order.
    #[serde(default = "default_groups")]
    pub groups: Vec<FeatureGroup>,
    /// Columns never considered, whatever group lists them.
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,
    /// Optional rescue applied once, after the greedy pass. Off by default;
    /// enabling it trades the correlation guarantee for guaranteed coverage
    /// of one group.
    #[serde(default)]
    pub forced_keep: Option<ForcedKeep>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            groups: default_groups(),
            excluded: default_excluded(),
            forced_keep: None,
        }
    }
}

impl SelectionConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_groups(mut self, groups: Vec<FeatureGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_forced_keep(mut self, group: impl Into<String>, feature: impl Into<String>) -> Self {
        self.forced_keep = Some(ForcedKeep {
            group: group.into(),
            feature: feature.into(),
        });
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(format!(
                "correlation threshold must be finite and non-negative, got {}",
                self.threshold
            ));
        }
        if self.groups.is_empty() {
            return Err("at least one feature group is required".to_string());
        }
        Ok(())
    }
}

/// Outcome for one group: the ranked candidates and the winner, if any.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSelection {
    pub group: String,
    /// Winning feature. None when every candidate exceeded the threshold.
    pub chosen: Option<String>,
    /// True when `chosen` came from the forced-keep rescue rather than the
    /// greedy pass.
    pub forced: bool,
    /// Candidates ordered ascending by max |correlation| at decision time.
    pub ranking: Vec<(String, f64)>,
}

/// Full selection report.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionResult {
    /// Selected features in pick order.
    pub selected: Vec<String>,
    /// Per-group outcomes in declared group order.
    pub groups: Vec<GroupSelection>,
}

impl SelectionResult {
    pub fn chosen_for(&self, group: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.group == group)
            .and_then(|g| g.chosen.as_deref())
    }

    pub fn failed_groups(&self) -> impl Iterator<Item = &GroupSelection> {
        self.groups.iter().filter(|g| g.chosen.is_none())
    }
}

/// Run the greedy pass over `matrix`.
///
/// Pure in the sense that the result depends only on the matrix contents
/// and the configuration; ties are broken by candidate declaration order,
/// so repeated runs agree.
pub fn select_features(matrix: &FeatureMatrix, config: &SelectionConfig) -> Result<SelectionResult> {
    let pool: Vec<String> = matrix
        .column_names()
        .iter()
        .filter(|c| !config.excluded.iter().any(|e| e == *c))
        .cloned()
        .collect();
    let corr = CorrelationMatrix::compute(matrix, &pool)?;

    let mut selected: Vec<String> = Vec::new();
    let mut groups: Vec<GroupSelection> = Vec::with_capacity(config.groups.len());

    for group in &config.groups {
        let mut ranking: Vec<(String, f64)> = group
            .candidates
            .iter()
            .filter(|f| {
                matrix.has_column(f)
                    && !config.excluded.iter().any(|e| e == *f)
                    && !selected.iter().any(|s| s == *f)
            })
            .map(|f| {
                let score = if !corr.contains(f) {
                    MISSING_CORRELATION_SCORE
                } else if selected.is_empty() {
                    0.0
                } else {
                    corr.max_abs_against(f, &selected)
                        .unwrap_or(MISSING_CORRELATION_SCORE)
                };
                (f.clone(), score)
            })
            .collect();
        // total_cmp keeps the sort stable and pushes NaN scores last.
        ranking.sort_by(|a, b| a.1.total_cmp(&b.1));

        let chosen = ranking
            .iter()
            .find(|(_, score)| *score <= config.threshold)
            .map(|(f, _)| f.clone());

        match &chosen {
            Some(feature) => {
                debug!(group = %group.name, %feature, "group representative selected");
                selected.push(feature.clone());
            }
            None => {
                warn!(group = %group.name, candidates = ranking.len(), "no candidate under threshold");
            }
        }
        groups.push(GroupSelection {
            group: group.name.clone(),
            chosen,
            forced: false,
            ranking,
        });
    }

    if let Some(rescue) = &config.forced_keep {
        let failed = groups
            .iter_mut()
            .find(|g| g.group == rescue.group && g.chosen.is_none());
        if let Some(entry) = failed {
            if matrix.has_column(&rescue.feature)
                && !selected.iter().any(|s| s == &rescue.feature)
            {
                warn!(group = %rescue.group, feature = %rescue.feature, "forcing feature past the correlation threshold");
                selected.push(rescue.feature.clone());
                entry.chosen = Some(rescue.feature.clone());
                entry.forced = true;
            }
        }
    }

    Ok(SelectionResult { selected, groups })
}

// ============================================================================
// Tests
// ============================================================================
