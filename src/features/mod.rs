//! Rolling-window indicator library over daily OHLCV and sentiment inputs.
//!
//! This module turns raw price history into the named numeric columns the
//! selection and fuzzy stages consume. Formulas are deliberately plain: the
//! interesting behavior lives downstream in how columns are pruned, encoded,
//! and labeled, so each indicator here is a direct composition of the window
//! kernels in [`rolling`].
//!
//! # Architecture
//!
//! The computation is organized into topic blocks:
//! - `trend`: momentum, EMA divergence, log-price slope, RSI (8 columns)
//! - `volatility`: return dispersion, ATR, Parkinson range, vol-of-vol (11 columns)
//! - `drawdown`: distance below highs, loss tails, drawdown duration (5 columns)
//! - `quality`: benchmark-relative strength and return-shape statistics (13 columns)
//! - `sentiment`: fear/greed index level, changes, z-score, percentile rank (9 columns)
//!
//! [`IndicatorEngine`] runs every block per ticker and assembles one
//! [`FeatureMatrix`] keyed by (Date, Ticker).
//!
//! # Feature Count Calculation
//!
//! | Configuration | Column Count | Breakdown |
//! |---------------|--------------|-----------|
//! | Without sentiment table | 37 | 8 trend + 11 vol + 5 stress + 13 quality |
//! | With sentiment table | 46 | 37 + 9 sentiment |
//!
//! Use [`IndicatorConfig::column_count()`] to get the computed count.
//!
//! # Example
//!
//! ```
//! use crypto_feature_pipeline::features::{IndicatorConfig, IndicatorEngine};
//! use crypto_feature_pipeline::schema::OhlcvSeries;
//! use chrono::NaiveDate;
//!
//! let day = |i: u64| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i);
//! let close: Vec<f64> = (0..5).map(|i| 100.0 + i as f64).collect();
//! let series = OhlcvSeries {
//!     ticker: "BTC".to_string(),
//!     dates: (0..5).map(day).collect(),
//!     open: close.clone(),
//!     high: close.iter().map(|c| c * 1.01).collect(),
//!     low: close.iter().map(|c| c * 0.99).collect(),
//!     close,
//!     volume: vec![1.0; 5],
//! };
//!
//! let engine = IndicatorEngine::new(IndicatorConfig::default());
//! let matrix = engine.compute_matrix(&[series], None).unwrap();
//! assert_eq!(matrix.n_columns(), 37);
//! assert_eq!(matrix.n_rows(), 5);
//! ```

pub mod drawdown;
pub mod quality;
pub mod rolling;
pub mod sentiment;
pub mod trend;
pub mod volatility;

// Re-export commonly used types for convenience
pub use quality::BenchmarkDaily;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::frame::FeatureMatrix;
use crate::schema::{OhlcvSeries, SentimentSeries};

/// Trend block column count.
pub const TREND_COLUMNS: usize = 8;
/// Volatility block column count (includes `ret_1d`).
pub const VOLATILITY_COLUMNS: usize = 11;
/// Stress/drawdown block column count.
pub const STRESS_COLUMNS: usize = 5;
/// Quality block column count.
pub const QUALITY_COLUMNS: usize = 13;
/// Sentiment block column count.
pub const SENTIMENT_COLUMNS: usize = 9;

/// Configuration for indicator computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Ticker whose returns anchor the benchmark-relative quality block.
    /// Must be present in the OHLCV input.
    pub benchmark_ticker: String,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            benchmark_ticker: "BTC".to_string(),
        }
    }
}

impl IndicatorConfig {
    /// Set the benchmark ticker.
    pub fn with_benchmark_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.benchmark_ticker = ticker.into();
        self
    }

    /// Total columns the engine will emit.
    pub fn column_count(&self, with_sentiment: bool) -> usize {
        let base = TREND_COLUMNS + VOLATILITY_COLUMNS + STRESS_COLUMNS + QUALITY_COLUMNS;
        if with_sentiment {
            base + SENTIMENT_COLUMNS
        } else {
            base
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.benchmark_ticker.trim().is_empty() {
            return Err("benchmark_ticker must not be empty".to_string());
        }
        Ok(())
    }
}

/// Computes the full indicator table from per-ticker price history.
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Runs every indicator block for every ticker and assembles the result
    /// into one matrix keyed by (Date, Ticker), tickers in sorted order.
    ///
    /// Fails fast when the configured benchmark ticker is absent: every
    /// quality column depends on it, so the run cannot proceed.
    pub fn compute_matrix(
        &self,
        series: &[OhlcvSeries],
        sentiment: Option<&SentimentSeries>,
    ) -> Result<FeatureMatrix> {
        let benchmark_series = series
            .iter()
            .find(|s| s.ticker == self.config.benchmark_ticker)
            .ok_or_else(|| {
                PipelineError::config(format!(
                    "benchmark ticker '{}' not present in OHLCV input",
                    self.config.benchmark_ticker
                ))
            })?;
        let benchmark = BenchmarkDaily::from_series(benchmark_series);

        let mut ordered: Vec<&OhlcvSeries> = series.iter().filter(|s| !s.is_empty()).collect();
        ordered.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        let mut dates = Vec::new();
        let mut tickers = Vec::new();
        let mut column_names: Vec<String> = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();

        for s in &ordered {
            debug!(ticker = %s.ticker, rows = s.len(), "computing indicator blocks");
            let mut block = trend::compute(&s.close);
            block.extend(volatility::compute(&s.high, &s.low, &s.close));
            block.extend(drawdown::compute(&s.close));
            block.extend(quality::compute(&s.dates, &s.close, &benchmark));
            if let Some(idx) = sentiment {
                block.extend(sentiment::compute(&s.dates, idx));
            }

            if column_names.is_empty() {
                column_names = block.iter().map(|(n, _)| n.clone()).collect();
                columns = vec![Vec::new(); column_names.len()];
            }
            debug_assert_eq!(column_names.len(), block.len());

            dates.extend_from_slice(&s.dates);
            tickers.extend(std::iter::repeat(s.ticker.clone()).take(s.len()));
            for (j, (_, values)) in block.into_iter().enumerate() {
                columns[j].extend(values);
            }
        }

        let mut matrix = FeatureMatrix::from_keys(dates, tickers)?;
        for (name, values) in column_names.into_iter().zip(columns) {
            matrix.push_column(name, values)?;
        }
        Ok(matrix)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Days::new(i as u64)
    }

    fn series(ticker: &str, n: usize, phase: f64) -> OhlcvSeries {
        let close: Vec<f64> = (0..n)
            .map(|i| 100.0 + 10.0 * ((i as f64) * 0.2 + phase).sin())
            .collect();
        OhlcvSeries {
            ticker: ticker.to_string(),
            dates: (0..n).map(day).collect(),
            open: close.clone(),
            high: close.iter().map(|c| c * 1.02).collect(),
            low: close.iter().map(|c| c * 0.98).collect(),
            close,
            volume: vec![1000.0; n],
        }
    }

    fn sentiment(n: usize) -> SentimentSeries {
        SentimentSeries {
            dates: (0..n).map(day).collect(),
            values: (0..n).map(|i| 40.0 + (i % 50) as f64).collect(),
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    #[test]
    fn test_default_config_is_valid() {
        assert!(IndicatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_benchmark_rejected() {
        let config = IndicatorConfig::default().with_benchmark_ticker("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_column_count_matches_blocks() {
        let config = IndicatorConfig::default();
        assert_eq!(config.column_count(false), 37);
        assert_eq!(config.column_count(true), 46);
    }

    // ------------------------------------------------------------------
    // Engine assembly
    // ------------------------------------------------------------------

    #[test]
    fn test_matrix_shape_with_sentiment() {
        let engine = IndicatorEngine::new(IndicatorConfig::default());
        let data = vec![series("BTC", 250, 0.0), series("ETH", 200, 1.0)];
        let idx = sentiment(250);
        let matrix = engine.compute_matrix(&data, Some(&idx)).unwrap();
        assert_eq!(matrix.n_rows(), 450);
        assert_eq!(matrix.n_columns(), 46);
        assert!(matrix.has_column("fgi_rank_180d"));
    }

    #[test]
    fn test_tickers_sorted_into_blocks() {
        let engine = IndicatorEngine::new(IndicatorConfig::default());
        let data = vec![series("ETH", 50, 1.0), series("BTC", 50, 0.0)];
        let matrix = engine.compute_matrix(&data, None).unwrap();
        let spans = matrix.ticker_spans();
        assert_eq!(spans[0].0, "BTC");
        assert_eq!(spans[1].0, "ETH");
    }

    #[test]
    fn test_missing_benchmark_is_fatal() {
        let engine = IndicatorEngine::new(
            IndicatorConfig::default().with_benchmark_ticker("SOL"),
        );
        let data = vec![series("BTC", 50, 0.0)];
        let err = engine.compute_matrix(&data, None).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("SOL"));
    }

    #[test]
    fn test_indicator_values_line_up_per_ticker() {
        // The ETH block must hold ETH's own momentum, not a continuation of
        // BTC's series.
        let engine = IndicatorEngine::new(IndicatorConfig::default());
        let btc = series("BTC", 60, 0.0);
        let eth = series("ETH", 60, 1.0);
        let matrix = engine
            .compute_matrix(&[btc, eth.clone()], None)
            .unwrap();

        let standalone = trend::compute(&eth.close);
        let expected = &standalone.iter().find(|(n, _)| n == "mom_7d").unwrap().1;
        let combined = matrix.column("mom_7d").unwrap();
        let eth_slice = &combined[60..120];
        for i in 0..60 {
            let (a, b) = (expected[i], eth_slice[i]);
            assert!(a.is_nan() && b.is_nan() || (a - b).abs() < 1e-15);
        }
    }
}
