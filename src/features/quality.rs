//! Return-quality indicators, absolute and benchmark-relative.
//!
//! The relative block (relative strength, beta, correlation, idiosyncratic
//! vol, information ratio) measures each asset against one benchmark ticker.
//! The benchmark's daily and compounded returns are computed once on its own
//! timeline, then joined onto each asset's dates; dates the benchmark never
//! traded resolve to `NaN` and flow through the usual window rules.

use chrono::NaiveDate;

use super::rolling::{
    downside_std, pct_change, rolling_apply, rolling_autocorr, rolling_compound_return,
    rolling_corr, rolling_cov, rolling_kurt, rolling_mean, rolling_skew, rolling_std,
    rolling_var, safe_div,
};
use crate::schema::OhlcvSeries;

const RS_WINDOW: usize = 30;
const BETA_WINDOW: usize = 60;
const IDIO_WINDOW: usize = 30;
const IR_WINDOW: usize = 30;
const SHARPE_WINDOW: usize = 60;
const HIT_WINDOW: usize = 30;
const RATIO_WINDOW: usize = 60;
const AUTOCORR_WINDOW: usize = 30;
const AUTOCORR_MIN_LEN: usize = 5;
const MOMENT_WINDOW: usize = 60;

/// Omega counts mass above and below this return threshold.
const OMEGA_THRESHOLD: f64 = 0.0;

/// Benchmark return history, precomputed once per run on the benchmark's own
/// timeline and joined per asset by exact date.
#[derive(Debug, Clone)]
pub struct BenchmarkDaily {
    dates: Vec<NaiveDate>,
    ret_1d: Vec<f64>,
    compound_30d: Vec<f64>,
}

impl BenchmarkDaily {
    pub fn from_series(series: &OhlcvSeries) -> Self {
        let ret_1d = pct_change(&series.close, 1);
        let compound_30d = rolling_compound_return(&ret_1d, RS_WINDOW);
        Self {
            dates: series.dates.clone(),
            ret_1d,
            compound_30d,
        }
    }

    #[inline]
    pub fn ticker_dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    fn lookup(&self, values: &[f64], date: NaiveDate) -> f64 {
        match self.dates.binary_search(&date) {
            Ok(i) => values[i],
            Err(_) => f64::NAN,
        }
    }

    /// Benchmark daily return per asset date, `NaN` on missing dates.
    pub fn aligned_returns(&self, dates: &[NaiveDate]) -> Vec<f64> {
        dates.iter().map(|&d| self.lookup(&self.ret_1d, d)).collect()
    }

    fn aligned_compound(&self, dates: &[NaiveDate]) -> Vec<f64> {
        dates
            .iter()
            .map(|&d| self.lookup(&self.compound_30d, d))
            .collect()
    }
}

/// All quality columns for one ticker, in artifact order.
pub fn compute(
    dates: &[NaiveDate],
    close: &[f64],
    benchmark: &BenchmarkDaily,
) -> Vec<(String, Vec<f64>)> {
    let ret = pct_change(close, 1);
    let mkt = benchmark.aligned_returns(dates);
    let mut out = Vec::new();

    // Relative strength: compounded asset return minus compounded benchmark
    // return over the same window. The benchmark side compounds on its own
    // timeline, so gaps in the asset's history do not distort it.
    let asset_30 = rolling_compound_return(&ret, RS_WINDOW);
    let mkt_30 = benchmark.aligned_compound(dates);
    let rs: Vec<f64> = asset_30.iter().zip(&mkt_30).map(|(&a, &m)| a - m).collect();
    out.push(("rs_30d".to_string(), rs));

    // Beta and correlation against the benchmark.
    let cov = rolling_cov(&ret, &mkt, BETA_WINDOW);
    let var = rolling_var(&mkt, BETA_WINDOW);
    let beta: Vec<f64> = cov.iter().zip(&var).map(|(&c, &v)| safe_div(c, v)).collect();
    out.push(("beta_60d".to_string(), beta.clone()));
    out.push(("corr_60d".to_string(), rolling_corr(&ret, &mkt, BETA_WINDOW)));

    // Idiosyncratic vol: dispersion of the beta-adjusted residual.
    let resid: Vec<f64> = ret
        .iter()
        .zip(&beta)
        .zip(&mkt)
        .map(|((&r, &b), &m)| r - b * m)
        .collect();
    out.push((
        "idio_vol_30d".to_string(),
        rolling_std(&resid, IDIO_WINDOW, 1),
    ));

    // Information ratio on excess returns.
    let excess: Vec<f64> = ret.iter().zip(&mkt).map(|(&r, &m)| r - m).collect();
    let ir: Vec<f64> = rolling_mean(&excess, IR_WINDOW)
        .iter()
        .zip(rolling_std(&excess, IR_WINDOW, 1))
        .map(|(&m, s)| safe_div(m, s))
        .collect();
    out.push(("ir_30d".to_string(), ir));

    // Absolute quality block.
    let mean_60 = rolling_mean(&ret, SHARPE_WINDOW);
    let sharpe: Vec<f64> = mean_60
        .iter()
        .zip(rolling_std(&ret, SHARPE_WINDOW, 1))
        .map(|(&m, s)| safe_div(m, s))
        .collect();
    out.push(("sharpe_60d".to_string(), sharpe));

    let sortino: Vec<f64> = mean_60
        .iter()
        .zip(rolling_apply(&ret, SHARPE_WINDOW, downside_std))
        .map(|(&m, d)| safe_div(m, d))
        .collect();
    out.push(("sortino_60d".to_string(), sortino));

    // Share of up days. Missing returns count as non-hits, so the ratio is
    // defined as soon as the window is full.
    let hits: Vec<f64> = ret
        .iter()
        .map(|&r| if r > 0.0 { 1.0 } else { 0.0 })
        .collect();
    out.push(("hit_ratio_30d".to_string(), rolling_mean(&hits, HIT_WINDOW)));

    out.push((
        "profit_factor_60d".to_string(),
        rolling_apply(&ret, RATIO_WINDOW, |w| gain_loss_ratio(w, 0.0)),
    ));
    out.push((
        "omega_60d".to_string(),
        rolling_apply(&ret, RATIO_WINDOW, |w| gain_loss_ratio(w, OMEGA_THRESHOLD)),
    ));

    out.push((
        "autocorr_30d".to_string(),
        rolling_autocorr(&ret, AUTOCORR_WINDOW, AUTOCORR_MIN_LEN),
    ));
    out.push(("skew_60d".to_string(), rolling_skew(&ret, MOMENT_WINDOW)));
    out.push(("kurt_60d".to_string(), rolling_kurt(&ret, MOMENT_WINDOW)));

    out
}

/// Mass above the threshold over mass below it, `NaN` when the window holds
/// no sub-threshold returns.
fn gain_loss_ratio(window: &[f64], threshold: f64) -> f64 {
    let mut gains = 0.0;
    let mut losses = 0.0;
    for &r in window {
        let d = r - threshold;
        if d > 0.0 {
            gains += d;
        } else if d < 0.0 {
            losses -= d;
        }
    }
    if losses == 0.0 {
        f64::NAN
    } else {
        gains / losses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Days::new(i as u64)
    }

    fn series(ticker: &str, close: Vec<f64>) -> OhlcvSeries {
        let n = close.len();
        OhlcvSeries {
            ticker: ticker.to_string(),
            dates: (0..n).map(day).collect(),
            open: close.clone(),
            high: close.iter().map(|c| c * 1.01).collect(),
            low: close.iter().map(|c| c * 0.99).collect(),
            close,
            volume: vec![1000.0; n],
        }
    }

    fn find<'a>(cols: &'a [(String, Vec<f64>)], name: &str) -> &'a [f64] {
        &cols.iter().find(|(n, _)| n == name).unwrap().1
    }

    #[test]
    fn test_asset_identical_to_benchmark() {
        let close: Vec<f64> = (0..120)
            .map(|i| 100.0 + 10.0 * ((i as f64) * 0.3).sin())
            .collect();
        let bench = BenchmarkDaily::from_series(&series("BTC", close.clone()));
        let cols = compute(&(0..120).map(day).collect::<Vec<_>>(), &close, &bench);

        // rs and ir collapse: zero excess return everywhere.
        let rs = find(&cols, "rs_30d");
        assert!(rs[100].abs() < 1e-12);
        let ir = find(&cols, "ir_30d");
        assert!(ir[100].is_nan(), "zero excess has zero std, division guarded");

        // Beta and correlation are exactly 1.
        let beta = find(&cols, "beta_60d");
        assert!((beta[100] - 1.0).abs() < 1e-9);
        let corr = find(&cols, "corr_60d");
        assert!((corr[100] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_benchmark_gap_dates_propagate_nan() {
        let close: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        // Benchmark missing the second half of the asset's dates.
        let bench = BenchmarkDaily::from_series(&series("BTC", close[..40].to_vec()));
        let dates: Vec<NaiveDate> = (0..80).map(day).collect();
        let cols = compute(&dates, &close, &bench);
        let beta = find(&cols, "beta_60d");
        assert!(beta[79].is_nan());
    }

    #[test]
    fn test_hit_ratio_alternating() {
        let mut close = vec![100.0];
        for i in 0..60 {
            let last = *close.last().unwrap();
            close.push(if i % 2 == 0 { last * 1.01 } else { last * 0.995 });
        }
        let bench = BenchmarkDaily::from_series(&series("BTC", close.clone()));
        let dates: Vec<NaiveDate> = (0..close.len()).map(day).collect();
        let cols = compute(&dates, &close, &bench);
        let hr = find(&cols, "hit_ratio_30d");
        assert!((hr[60] - 0.5).abs() < 0.04);
    }

    #[test]
    fn test_gain_loss_ratio_guard() {
        assert!(gain_loss_ratio(&[0.01, 0.02], 0.0).is_nan());
        let r = gain_loss_ratio(&[0.02, -0.01], 0.0);
        assert!((r - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sortino_uses_downside_only() {
        // Big upside moves, small varied downside: Sortino far above Sharpe.
        let mut close = vec![100.0];
        for i in 0..80 {
            let last = *close.last().unwrap();
            close.push(match i % 6 {
                0 => last * 0.999,
                3 => last * 0.998,
                _ => last * 1.02,
            });
        }
        let bench = BenchmarkDaily::from_series(&series("BTC", close.clone()));
        let dates: Vec<NaiveDate> = (0..close.len()).map(day).collect();
        let cols = compute(&dates, &close, &bench);
        let sharpe = find(&cols, "sharpe_60d");
        let sortino = find(&cols, "sortino_60d");
        assert!(sortino[80] > sharpe[80]);
    }
}
