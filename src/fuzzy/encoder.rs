//! Fuzzification of selected features into [0, 1] membership columns.
//!
//! Anchors are quantiles of the feature's own (possibly transformed)
//! distribution, so the encoding is adaptive: "high volatility" means high
//! for that asset's history, not against a fixed scale. Missing values are
//! filled with the feature median before anchoring, which puts them square
//! in the neutral state instead of dropping rows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result, MIN_QUANTILE_OBSERVATIONS};
use crate::preprocessing::{median, quantiles};

use super::membership::{gaussian, trapezoidal, triangular, MembershipFamily};

/// IQR to standard deviation conversion under normality.
const IQR_TO_SIGMA: f64 = 1.349;
/// Width floor so a near-constant feature still encodes as a spike.
const SIGMA_FLOOR: f64 = 1e-6;
/// Quantile probabilities every family's anchors are drawn from.
pub const ANCHOR_PROBS: [f64; 7] = [0.10, 0.25, 0.40, 0.50, 0.60, 0.75, 0.90];

/// Quantile anchors of one transformed feature.
#[derive(Debug, Clone, Copy)]
struct Anchors {
    q10: f64,
    q25: f64,
    q40: f64,
    q50: f64,
    q60: f64,
    q75: f64,
    q90: f64,
}

/// Binds a feature group to the membership family its representative is
/// encoded with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyAssignment {
    pub group: String,
    pub family: MembershipFamily,
}

/// Default group-to-family bindings for the built-in groups.
pub fn default_assignments() -> Vec<FamilyAssignment> {
    let bind = |group: &str, family| FamilyAssignment {
        group: group.to_string(),
        family,
    };
    vec![
        bind("trend", MembershipFamily::Trend),
        bind("vol", MembershipFamily::Volatility),
        bind("stress", MembershipFamily::Stress),
        bind("quality", MembershipFamily::BoundedSymmetric),
        bind("macro", MembershipFamily::MacroVolatility),
    ]
}

/// Configuration for the fuzzification stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyConfig {
    /// Group-to-family bindings, in output column order.
    #[serde(default = "default_assignments")]
    pub assignments: Vec<FamilyAssignment>,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            assignments: default_assignments(),
        }
    }
}

impl FuzzyConfig {
    pub fn family_for(&self, group: &str) -> Option<MembershipFamily> {
        self.assignments
            .iter()
            .find(|a| a.group == group)
            .map(|a| a.family)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.assignments.is_empty() {
            return Err("at least one family assignment is required".to_string());
        }
        for (i, a) in self.assignments.iter().enumerate() {
            if self.assignments[..i].iter().any(|b| b.group == a.group) {
                return Err(format!("group '{}' assigned twice", a.group));
            }
            // Families own their state column names, so each family can
            // appear at most once per encoding.
            if self.assignments[..i].iter().any(|b| b.family == a.family) {
                return Err(format!(
                    "family {:?} assigned twice; its state columns would collide",
                    a.family
                ));
            }
        }
        Ok(())
    }
}

/// The three membership columns derived from one feature.
///
/// `columns` holds the family's state columns in label order, each as long
/// as the input and valued in [0, 1]. `source` names the feature the set
/// was anchored on.
#[derive(Debug, Clone)]
pub struct MembershipSet {
    pub source: String,
    pub columns: Vec<(String, Vec<f64>)>,
}

/// Encode one feature column into its family's three membership columns.
///
/// Requires at least [`MIN_QUANTILE_OBSERVATIONS`] valid values so the
/// anchors mean something. Anchors are quantiles of the valid values only;
/// NaN rows are filled with the feature median for evaluation, so they land
/// in the neutral state without moving the anchors. Every output value lies
/// in [0, 1].
pub fn encode(name: &str, values: &[f64], family: MembershipFamily) -> Result<MembershipSet> {
    let valid = values.iter().filter(|v| !v.is_nan()).count();
    if valid < MIN_QUANTILE_OBSERVATIONS {
        return Err(PipelineError::InsufficientData {
            column: name.to_string(),
            valid,
            required: MIN_QUANTILE_OBSERVATIONS,
        });
    }

    // Anchors come from the observed values only; the median fill below is
    // an evaluation-time substitute and must not shift the quantiles.
    let observed: Vec<f64> = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| transform_value(family, v))
        .collect();
    let qs = quantiles(&observed, &ANCHOR_PROBS).ok_or_else(|| {
        PipelineError::InsufficientData {
            column: name.to_string(),
            valid: 0,
            required: MIN_QUANTILE_OBSERVATIONS,
        }
    })?;

    let fill = median(values).unwrap_or(0.0);
    let transformed: Vec<f64> = values
        .iter()
        .map(|&v| transform_value(family, if v.is_nan() { fill } else { v }))
        .collect();
    let anchors = Anchors {
        q10: qs[0],
        q25: qs[1],
        q40: qs[2],
        q50: qs[3],
        q60: qs[4],
        q75: qs[5],
        q90: qs[6],
    };
    debug!(feature = name, ?family, median = anchors.q50, "fuzzifying feature");

    let mut columns = vec![Vec::with_capacity(values.len()); 3];
    for &x in &transformed {
        let m = evaluate(family, &anchors, x);
        for (column, value) in columns.iter_mut().zip(m) {
            column.push(value);
        }
    }

    Ok(MembershipSet {
        source: name.to_string(),
        columns: family
            .labels()
            .iter()
            .zip(columns)
            .map(|(label, column)| (label.to_string(), column))
            .collect(),
    })
}

/// Family-specific value transform applied before anchoring and evaluation.
fn transform_value(family: MembershipFamily, x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    match family {
        MembershipFamily::Trend
        | MembershipFamily::Volatility
        | MembershipFamily::MacroVolatility => x,
        // Stress features are non-negative and heavy-tailed; compress the
        // tail so the upper anchors are not dominated by a few spikes.
        MembershipFamily::Stress => x.max(0.0).ln_1p(),
        MembershipFamily::BoundedSymmetric => x.clamp(-1.0, 1.0),
    }
}

fn evaluate(family: MembershipFamily, a: &Anchors, x: f64) -> [f64; 3] {
    match family {
        MembershipFamily::Trend => [
            triangular(x, a.q10, a.q25, a.q50),
            trapezoidal(x, a.q40, a.q50, a.q50, a.q60),
            triangular(x, a.q50, a.q75, a.q90),
        ],
        MembershipFamily::Volatility | MembershipFamily::MacroVolatility => {
            let sigma = ((a.q75 - a.q25) / IQR_TO_SIGMA).max(SIGMA_FLOOR);
            [
                gaussian(x, a.q25, sigma),
                gaussian(x, a.q50, sigma),
                gaussian(x, a.q75, sigma),
            ]
        }
        MembershipFamily::Stress => [
            triangular(x, a.q10, a.q25, a.q50),
            trapezoidal(x, a.q25, a.q50, a.q50, a.q75),
            triangular(x, a.q50, a.q75, a.q90),
        ],
        MembershipFamily::BoundedSymmetric => [
            triangular(x, -1.0, a.q10, 0.0),
            trapezoidal(x, a.q40, 0.0, 0.0, a.q60),
            triangular(x, 0.0, a.q90, 1.0),
        ],
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
    }

    fn assert_unit_interval(columns: &[(String, Vec<f64>)]) {
        for (label, values) in columns {
            for (i, v) in values.iter().enumerate() {
                assert!(
                    (0.0..=1.0).contains(v),
                    "{label}[{i}] = {v} outside [0, 1]"
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    #[test]
    fn test_too_few_observations_rejected() {
        let mut values = vec![f64::NAN; 20];
        for (i, v) in values.iter_mut().take(9).enumerate() {
            *v = i as f64;
        }
        let err = encode("mom_7d", &values, MembershipFamily::Trend).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData {
                valid: 9,
                required: 10,
                ..
            }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let mut cfg = FuzzyConfig::default();
        cfg.assignments.push(FamilyAssignment {
            group: "trend".to_string(),
            family: MembershipFamily::Volatility,
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_duplicate_family_rejected() {
        let mut cfg = FuzzyConfig::default();
        cfg.assignments.push(FamilyAssignment {
            group: "liquidity".to_string(),
            family: MembershipFamily::Volatility,
        });
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("assigned twice"), "{err}");
    }

    #[test]
    fn test_default_bindings_cover_builtin_groups() {
        let cfg = FuzzyConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.family_for("vol"), Some(MembershipFamily::Volatility));
        assert_eq!(
            cfg.family_for("quality"),
            Some(MembershipFamily::BoundedSymmetric)
        );
        assert_eq!(cfg.family_for("nonsense"), None);
    }

    // ------------------------------------------------------------------
    // Encoding
    // ------------------------------------------------------------------

    #[test]
    fn test_outputs_bounded_even_for_extremes() {
        let mut values = ramp(100);
        values.push(1e9);
        values.push(-1e9);
        for family in [
            MembershipFamily::Trend,
            MembershipFamily::Volatility,
            MembershipFamily::Stress,
            MembershipFamily::BoundedSymmetric,
            MembershipFamily::MacroVolatility,
        ] {
            let set = encode("x", &values, family).unwrap();
            assert_eq!(set.source, "x");
            assert_eq!(set.columns.len(), 3);
            assert_unit_interval(&set.columns);
        }
    }

    #[test]
    fn test_trend_states_fire_at_their_anchors() {
        let values = ramp(101);
        let columns = encode("mom_7d", &values, MembershipFamily::Trend)
            .unwrap()
            .columns;
        // Uniform ramp: q25 = 0.25, q50 = 0.50, q75 = 0.75 at indices
        // 25/50/75.
        let bear = &columns[0].1;
        let neutral = &columns[1].1;
        let bull = &columns[2].1;
        assert!((bear[25] - 1.0).abs() < 1e-9);
        assert!((neutral[50] - 1.0).abs() < 1e-9);
        assert!((bull[75] - 1.0).abs() < 1e-9);
        // Far above the bull peak the state switches off entirely.
        assert_eq!(bull[100], 0.0);
    }

    #[test]
    fn test_volatility_mid_peaks_at_median() {
        let values = ramp(101);
        let columns = encode("vol_30d", &values, MembershipFamily::Volatility)
            .unwrap()
            .columns;
        let mid = &columns[1].1;
        assert!((mid[50] - 1.0).abs() < 1e-9);
        assert!(mid[0] < mid[50]);
        assert!(mid[100] < mid[50]);
    }

    #[test]
    fn test_stress_anchors_on_log_scale() {
        // Nine copies each of 0..=9 plus five huge spikes. On the log1p
        // scale the anchors land exactly on small values (q25 = ln1p(2),
        // q50 = ln1p(5), q75 = ln1p(7)) instead of being dragged toward the
        // spikes.
        let mut values: Vec<f64> = (0..90).map(|i| (i % 10) as f64).collect();
        values.extend([500.0, 800.0, 1200.0, 2000.0, 5000.0]);
        let columns = encode("dd_dur_60d", &values, MembershipFamily::Stress)
            .unwrap()
            .columns;
        assert_unit_interval(&columns);
        let low = &columns[0].1;
        let mid = &columns[1].1;
        // values[2] == 2.0 sits on the low peak, values[5] == 5.0 on the
        // mid plateau.
        assert!((low[2] - 1.0).abs() < 1e-12);
        assert!((mid[5] - 1.0).abs() < 1e-12);
        // The spikes are far outside every support.
        assert_eq!(mid[94], 0.0);
    }

    #[test]
    fn test_bounded_symmetric_neutral_at_zero() {
        let values: Vec<f64> = (0..101).map(|i| (i as f64 - 50.0) / 60.0).collect();
        let columns = encode("autocorr_30d", &values, MembershipFamily::BoundedSymmetric)
            .unwrap()
            .columns;
        let negative = &columns[0].1;
        let neutral = &columns[1].1;
        let positive = &columns[2].1;
        // values[50] == 0.0 exactly.
        assert_eq!(neutral[50], 1.0);
        assert_eq!(negative[50], 0.0);
        assert_eq!(positive[50], 0.0);
        assert!(negative[0] > 0.0);
        assert!(positive[100] > 0.0);
    }

    #[test]
    fn test_nan_filled_with_median_lands_neutral() {
        let mut values = ramp(101);
        values[30] = f64::NAN;
        values[60] = f64::NAN;
        let columns = encode("mom_7d", &values, MembershipFamily::Trend)
            .unwrap()
            .columns;
        let neutral = &columns[1].1;
        // Filled rows carry the median, which sits on the neutral plateau.
        assert!(neutral[30] > 0.99);
        assert!(neutral[60] > 0.99);
    }

    #[test]
    fn test_missing_rows_do_not_shift_anchors() {
        // Appending NaN-only rows must leave the anchors untouched, so the
        // memberships of the observed rows stay exactly where they were.
        let base = ramp(100);
        let mut padded = base.clone();
        padded.extend(std::iter::repeat(f64::NAN).take(100));

        for family in [
            MembershipFamily::Trend,
            MembershipFamily::Volatility,
            MembershipFamily::Stress,
            MembershipFamily::BoundedSymmetric,
            MembershipFamily::MacroVolatility,
        ] {
            let plain = encode("x", &base, family).unwrap();
            let with_gaps = encode("x", &padded, family).unwrap();
            for ((label_a, col_a), (label_b, col_b)) in
                plain.columns.iter().zip(&with_gaps.columns)
            {
                assert_eq!(label_a, label_b);
                assert_eq!(col_a.as_slice(), &col_b[..base.len()], "{label_a}");
            }
        }
    }

    #[test]
    fn test_constant_feature_encodes_without_error() {
        let values = vec![3.0; 50];
        let columns = encode("vol_7d", &values, MembershipFamily::Volatility)
            .unwrap()
            .columns;
        assert_unit_interval(&columns);
        // All anchors collapse to 3.0; every state fires at full strength.
        for (_, column) in &columns {
            assert!(column.iter().all(|&v| v == 1.0));
        }
    }
}
