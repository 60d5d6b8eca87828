//! Sentiment-index derived columns.
//!
//! The sentiment table is global (one value per calendar date), so it is
//! joined onto each asset's trading dates by exact match before any window
//! runs. Dates without a published value stay `NaN` and gate the derived
//! columns through the usual window rules; the exponential mean instead
//! rides through gaps with decayed weight.

use chrono::NaiveDate;

use super::rolling::{diff, ewm_mean_span, rolling_mean, rolling_rank_pct, rolling_std, safe_div};
use crate::schema::SentimentSeries;

const CHANGE_WINDOWS: [usize; 3] = [1, 7, 14];
const EMA_SPAN: usize = 14;
const ZSCORE_WINDOW: usize = 90;
const VOL_WINDOW: usize = 30;
const RANK_WINDOW: usize = 180;

/// All sentiment columns for one ticker's dates, in artifact order.
pub fn compute(dates: &[NaiveDate], sentiment: &SentimentSeries) -> Vec<(String, Vec<f64>)> {
    let fgi = sentiment.join_left(dates);
    let mut out = vec![("fgi".to_string(), fgi.clone())];

    for w in CHANGE_WINDOWS {
        out.push((format!("fgi_chg_{w}d"), diff(&fgi, w)));
    }

    let ema = ewm_mean_span(&fgi, EMA_SPAN);
    let gap: Vec<f64> = fgi.iter().zip(&ema).map(|(&v, &e)| v - e).collect();
    out.push(("fgi_ema_14".to_string(), ema));
    out.push(("fgi_gap_ema14".to_string(), gap));

    // Z-score against the trailing window; a flat window is undefined, not 0.
    let mean = rolling_mean(&fgi, ZSCORE_WINDOW);
    let std = rolling_std(&fgi, ZSCORE_WINDOW, 1);
    let zscore: Vec<f64> = fgi
        .iter()
        .zip(mean.iter().zip(&std))
        .map(|(&v, (&m, &s))| safe_div(v - m, s))
        .collect();
    out.push(("fgi_z_90d".to_string(), zscore));

    let chg_1d = diff(&fgi, 1);
    out.push((
        "fgi_vol_30d".to_string(),
        rolling_std(&chg_1d, VOL_WINDOW, 1),
    ));

    out.push((
        "fgi_rank_180d".to_string(),
        rolling_rank_pct(&fgi, RANK_WINDOW),
    ));

    out
}
