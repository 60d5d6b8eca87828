//! Feature groups: named topic buckets over indicator columns.
//!
//! The correlation-constrained selector keeps at most one feature per group,
//! walking groups in declared order. Candidates that are absent from the
//! matrix are silently skipped, so a group list may safely name indicators
//! the current run did not compute.

use serde::{Deserialize, Serialize};

/// A named bucket of candidate feature columns, in preference-declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGroup {
    pub name: String,
    pub candidates: Vec<String>,
}

impl FeatureGroup {
    pub fn new(name: impl Into<String>, candidates: &[&str]) -> Self {
        Self {
            name: name.into(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Columns never offered to the selector even when present in the matrix.
/// The raw daily return is an input to half the indicator set, so keeping it
/// would let it shadow every derived column.
pub const ALWAYS_EXCLUDED: [&str; 1] = ["ret_1d"];

/// The five default topic buckets over the built-in indicator library.
///
/// Order matters: earlier groups select first and constrain later ones.
pub fn default_groups() -> Vec<FeatureGroup> {
    vec![
        FeatureGroup::new(
            "trend",
            &[
                "mom_7d",
                "mom_14d",
                "mom_30d",
                "mom_60d",
                "ema_diff",
                "ema_cross_12_26",
                "slope_30d",
                "rsi_14_n",
            ],
        ),
        FeatureGroup::new(
            "vol",
            &[
                "vol_7d",
                "vol_30d",
                "vol_60d",
                "idio_vol_30d",
                "atrp_14",
                "rv_14d",
                "rv_60d",
                "downside_vol_60d",
                "parkinson_vol_30d",
                "vov_60d",
            ],
        ),
        FeatureGroup::new(
            "stress",
            &[
                "drawdown_90d",
                "max_dd_30d",
                "max_loss_30d",
                "cvar_5_60d",
                "dd_dur_60d",
            ],
        ),
        FeatureGroup::new(
            "quality",
            &[
                "ir_30d",
                "rs_30d",
                "sharpe_60d",
                "sortino_60d",
                "hit_ratio_30d",
                "profit_factor_60d",
                "omega_60d",
                "autocorr_30d",
                "skew_60d",
                "kurt_60d",
            ],
        ),
        FeatureGroup::new(
            "macro",
            &[
                "fgi",
                "fgi_chg_1d",
                "fgi_chg_7d",
                "fgi_chg_14d",
                "fgi_ema_14",
                "fgi_gap_ema14",
                "fgi_z_90d",
                "fgi_vol_30d",
                "fgi_rank_180d",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_groups_order() {
        let groups = default_groups();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["trend", "vol", "stress", "quality", "macro"]);
    }

    #[test]
    fn test_default_groups_are_disjoint() {
        let groups = default_groups();
        let mut seen = std::collections::HashSet::new();
        for g in &groups {
            for c in &g.candidates {
                assert!(seen.insert(c.clone()), "{c} appears in two groups");
            }
        }
    }

    #[test]
    fn test_excluded_not_in_any_group() {
        for g in default_groups() {
            for excluded in ALWAYS_EXCLUDED {
                assert!(!g.candidates.iter().any(|c| c == excluded));
            }
        }
    }

    #[test]
    fn test_group_serde_round_trip() {
        let g = FeatureGroup::new("trend", &["mom_7d", "slope_30d"]);
        let json = serde_json::to_string(&g).unwrap();
        let back: FeatureGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(g, back);
    }
}
