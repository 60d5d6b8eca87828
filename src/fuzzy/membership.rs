//! Membership primitives and the family catalog.
//!
//! Three scalar kernels (triangular, trapezoidal, gaussian) plus the enum
//! naming how a feature's three linguistic states are carved out of its
//! own empirical distribution. Anchor placement lives in the encoder; this
//! module only knows shapes and label names.

use serde::{Deserialize, Serialize};

/// Triangular membership with peak at `b` over support `(a, c)`.
///
/// Rising on `(a, b]`, falling on `(b, c)`, exactly 1.0 at `b` even when a
/// limb is degenerate. Misordered anchors disable the affected limb rather
/// than flipping it.
pub fn triangular(x: f64, a: f64, b: f64, c: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let mut y = 0.0;
    if b > a && x > a && x <= b {
        y = (x - a) / (b - a);
    }
    if c > b && x > b && x < c {
        y = (c - x) / (c - b);
    }
    if x == b {
        y = 1.0;
    }
    y.clamp(0.0, 1.0)
}

/// Trapezoidal membership with plateau `[b, c]` over support `(a, d)`.
///
/// A zero-width limb (`a == b` or `c == d`) is simply absent, giving a
/// crisp shoulder on that side.
pub fn trapezoidal(x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let y = if x >= b && x <= c {
        1.0
    } else if b > a && x > a && x < b {
        (x - a) / (b - a)
    } else if d > c && x > c && x < d {
        (d - x) / (d - c)
    } else {
        0.0
    };
    y.clamp(0.0, 1.0)
}

/// Gaussian membership centered at `mu`.
///
/// `sigma` is floored internally so a degenerate width collapses to a spike
/// at `mu` instead of dividing by zero.
pub fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let s = sigma.max(1e-12);
    let z = (x - mu) / s;
    (-0.5 * z * z).exp()
}

/// How one selected feature is fuzzified into three states.
///
/// Each family fixes both the anchor construction (in the encoder) and the
/// three output label names, so the fuzzy table schema is stable no matter
/// which feature won its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipFamily {
    /// Directional features. Triangles below/above the median with a tight
    /// trapezoid around it: bear / neutral / bull.
    Trend,
    /// Dispersion features. Three gaussians at the quartiles with an
    /// IQR-derived common width: low / mid / high.
    Volatility,
    /// Heavy-tailed non-negative features. Values are log1p-compressed
    /// before anchoring: low / mid / high.
    Stress,
    /// Features naturally bounded in [-1, 1] and centered at zero, such as
    /// autocorrelation: negative / neutral / positive.
    BoundedSymmetric,
    /// Market-wide sentiment dispersion. Same shape as `Volatility` with
    /// regime-flavored names: calm / neutral / stress.
    MacroVolatility,
}

impl MembershipFamily {
    /// Output column names, low state first.
    pub fn labels(&self) -> [&'static str; 3] {
        match self {
            Self::Trend => ["trend_bear", "trend_neutral", "trend_bull"],
            Self::Volatility => ["vol_low", "vol_mid", "vol_high"],
            Self::Stress => ["stress_low", "stress_mid", "stress_high"],
            Self::BoundedSymmetric => ["ac_negative", "ac_neutral", "ac_positive"],
            Self::MacroVolatility => ["macro_calm", "macro_neutral", "macro_stress"],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
