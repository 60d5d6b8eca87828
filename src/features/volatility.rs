//! Volatility indicators from OHLC prices.
//!
//! Two std conventions coexist here on purpose: the `vol_*` columns use the
//! population estimator (ddof 0) while `rv_*`, `downside_vol_60d`, and
//! `vov_60d` use the sample estimator (ddof 1). Downstream selection treats
//! them as distinct candidates within the same bucket.

use super::rolling::{
    downside_std, pct_change, rolling_apply, rolling_mean, rolling_std, safe_div, true_range,
};

const VOL_WINDOWS: [usize; 3] = [7, 30, 60];
const ATR_PERIOD: usize = 14;
const RV_WINDOWS: [usize; 2] = [14, 60];
const DOWNSIDE_WINDOW: usize = 60;
const PARKINSON_WINDOW: usize = 30;
const VOV_WINDOW: usize = 60;

const LN4: f64 = 4.0 * std::f64::consts::LN_2;

/// All volatility columns for one ticker, in artifact order.
/// `ret_1d` is included: it feeds half the indicator set and is exported
/// with the full table even though selection always excludes it.
pub fn compute(high: &[f64], low: &[f64], close: &[f64]) -> Vec<(String, Vec<f64>)> {
    let ret_1d = pct_change(close, 1);
    let mut out = vec![("ret_1d".to_string(), ret_1d.clone())];

    for w in VOL_WINDOWS {
        out.push((format!("vol_{w}d"), rolling_std(&ret_1d, w, 0)));
    }

    // Average true range and its price-relative form.
    let tr = true_range(high, low, close);
    let atr = rolling_mean(&tr, ATR_PERIOD);
    let atrp: Vec<f64> = atr
        .iter()
        .zip(close)
        .map(|(&a, &c)| safe_div(a, c))
        .collect();
    out.push(("atr_14".to_string(), atr));
    out.push(("atrp_14".to_string(), atrp));

    for w in RV_WINDOWS {
        out.push((format!("rv_{w}d"), rolling_std(&ret_1d, w, 1)));
    }

    out.push((
        "downside_vol_60d".to_string(),
        rolling_apply(&ret_1d, DOWNSIDE_WINDOW, downside_std),
    ));

    // Parkinson range estimator: sqrt(mean(ln(H/L)^2) / (4 ln 2)).
    let sq_log_range: Vec<f64> = high
        .iter()
        .zip(low)
        .map(|(&h, &l)| {
            if h > 0.0 && l > 0.0 {
                let r = (h / l).ln();
                r * r
            } else {
                f64::NAN
            }
        })
        .collect();
    let parkinson: Vec<f64> = rolling_mean(&sq_log_range, PARKINSON_WINDOW)
        .into_iter()
        .map(|m| (m / LN4).sqrt())
        .collect();
    out.push(("parkinson_vol_30d".to_string(), parkinson));

    // Vol of vol: dispersion of the short realized-vol series.
    let rv_14 = rolling_std(&ret_1d, RV_WINDOWS[0], 1);
    out.push((
        "vov_60d".to_string(),
        rolling_std(&rv_14, VOV_WINDOW, 1),
    ));

    out
}
