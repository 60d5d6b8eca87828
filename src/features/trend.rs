//! Trend indicators from close prices.
//!
//! Computes the momentum/direction block:
//! - Momentum over 7/14/30/60 days (simple percentage change)
//! - EMA divergence and EMA cross ratio (12 vs 26 day spans)
//! - 30-day log-price regression slope
//! - Centered, scaled RSI(14)

use super::rolling::{
    diff, ewm_mean_alpha, ewm_mean_span, pct_change, rolling_slope, safe_div,
};

const MOMENTUM_WINDOWS: [usize; 4] = [7, 14, 30, 60];
const EMA_FAST: usize = 12;
const EMA_SLOW: usize = 26;
const SLOPE_WINDOW: usize = 30;
const RSI_PERIOD: usize = 14;

/// All trend columns for one ticker, in artifact order.
pub fn compute(close: &[f64]) -> Vec<(String, Vec<f64>)> {
    let mut out = Vec::new();

    for w in MOMENTUM_WINDOWS {
        out.push((format!("mom_{w}d"), pct_change(close, w)));
    }

    // EMA divergence: (fast - slow) / slow, and the ratio-style cross signal.
    let fast = ewm_mean_span(close, EMA_FAST);
    let slow = ewm_mean_span(close, EMA_SLOW);
    let ema_diff: Vec<f64> = fast
        .iter()
        .zip(&slow)
        .map(|(&f, &s)| safe_div(f - s, s))
        .collect();
    let ema_cross: Vec<f64> = fast
        .iter()
        .zip(&slow)
        .map(|(&f, &s)| safe_div(f, s) - 1.0)
        .collect();
    out.push(("ema_diff".to_string(), ema_diff));
    out.push(("ema_cross_12_26".to_string(), ema_cross));

    // Drift of log price: per-day slope of a least-squares line over the window.
    let log_close: Vec<f64> = close
        .iter()
        .map(|&c| if c > 0.0 { c.ln() } else { f64::NAN })
        .collect();
    out.push((
        "slope_30d".to_string(),
        rolling_slope(&log_close, SLOPE_WINDOW),
    ));

    out.push(("rsi_14_n".to_string(), normalized_rsi(close, RSI_PERIOD)));
    out
}

/// RSI via Wilder smoothing, recentred from [0, 100] to [-1, 1].
///
/// Undefined positions (warmup, flat stretches where the smoothed loss is
/// zero) report the neutral value 0 rather than `NaN`, matching the
/// convention that "no signal" is neutral momentum.
fn normalized_rsi(close: &[f64], period: usize) -> Vec<f64> {
    let delta = diff(close, 1);
    let clip_pos = |d: f64| if d.is_nan() { f64::NAN } else { d.max(0.0) };
    let gains: Vec<f64> = delta.iter().map(|&d| clip_pos(d)).collect();
    let losses: Vec<f64> = delta.iter().map(|&d| clip_pos(-d)).collect();

    let alpha = 1.0 / period as f64;
    let avg_gain = ewm_mean_alpha(&gains, alpha, period);
    let avg_loss = ewm_mean_alpha(&losses, alpha, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| {
            let rs = if l == 0.0 { f64::NAN } else { g / l };
            let rsi = if g.is_nan() || rs.is_nan() {
                50.0
            } else {
                100.0 - 100.0 / (1.0 + rs)
            };
            (rsi - 50.0) / 50.0
        })
        .collect()
}
