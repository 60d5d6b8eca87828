//! Stress and tail-risk indicators.
//!
//! Sign conventions follow the column names, not a shared rule:
//! `drawdown_90d` is non-positive (distance below the 90-day high) while
//! `max_dd_30d` is non-negative (worst depth reached inside the window).

use super::rolling::{
    drawdown_duration, pct_change, rolling_cvar, rolling_max, rolling_min, safe_div,
};

const DRAWDOWN_WINDOW: usize = 90;
const MAX_DD_WINDOW: usize = 30;
const MAX_LOSS_WINDOW: usize = 30;
const CVAR_WINDOW: usize = 60;
const CVAR_TAIL: f64 = 0.05;
const DD_DUR_WINDOW: usize = 60;

/// All stress columns for one ticker, in artifact order.
pub fn compute(close: &[f64]) -> Vec<(String, Vec<f64>)> {
    let ret_1d = pct_change(close, 1);
    let mut out = Vec::new();

    // Distance below the rolling 90-day high, <= 0.
    let high_90 = rolling_max(close, DRAWDOWN_WINDOW);
    let drawdown_90: Vec<f64> = close
        .iter()
        .zip(&high_90)
        .map(|(&c, &h)| safe_div(c - h, h))
        .collect();
    out.push(("drawdown_90d".to_string(), drawdown_90));

    // Worst depth below the rolling 30-day high seen over the last 30 days, >= 0.
    let high_30 = rolling_max(close, MAX_DD_WINDOW);
    let depth: Vec<f64> = close
        .iter()
        .zip(&high_30)
        .map(|(&c, &h)| safe_div(h - c, h))
        .collect();
    out.push(("max_dd_30d".to_string(), rolling_max(&depth, MAX_DD_WINDOW)));

    out.push((
        "max_loss_30d".to_string(),
        rolling_min(&ret_1d, MAX_LOSS_WINDOW),
    ));

    out.push((
        "cvar_5_60d".to_string(),
        rolling_cvar(&ret_1d, CVAR_WINDOW, CVAR_TAIL),
    ));

    out.push((
        "dd_dur_60d".to_string(),
        rolling_max(&drawdown_duration(close), DD_DUR_WINDOW),
    ));

    out
}
