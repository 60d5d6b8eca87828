//! Column-oriented feature table keyed by (Date, Ticker).
//!
//! # Overview
//!
//! [`FeatureMatrix`] is the tabular currency of the pipeline: every stage
//! (indicator computation, correlation selection, fuzzy encoding, labeling,
//! scaling) consumes and produces one. Columns are named `f64` sequences with
//! `NaN` marking missing values; rows are keyed by parallel date and ticker
//! vectors.
//!
//! Key invariant: rows are grouped into contiguous ticker blocks, and within
//! each block dates are strictly increasing. Construction validates this once
//! so downstream stages can rely on it without re-checking.
//!
//! # Example
//!
//! ```
//! use crypto_feature_pipeline::frame::FeatureMatrix;
//! use chrono::NaiveDate;
//!
//! let day = |n: u32| NaiveDate::from_ymd_opt(2024, 1, n).unwrap();
//! let mut matrix = FeatureMatrix::from_keys(
//!     vec![day(1), day(2), day(3)],
//!     vec!["BTC".into(), "BTC".into(), "BTC".into()],
//! ).unwrap();
//!
//! matrix.push_column("mom_7d", vec![0.01, -0.02, f64::NAN]).unwrap();
//! assert_eq!(matrix.n_rows(), 3);
//! assert!(matrix.column("mom_7d").unwrap()[2].is_nan());
//! ```

use ahash::AHashMap;
use chrono::NaiveDate;
use ndarray::Array2;
use std::ops::Range;

use crate::error::{PipelineError, Result};

/// Canonical name of the date key column in delimited artifacts.
pub const DATE_COLUMN: &str = "Date";

/// Canonical name of the ticker key column in delimited artifacts.
pub const TICKER_COLUMN: &str = "Ticker";

/// Column-major numeric table keyed by (Date, Ticker).
///
/// Missing values are `NaN`. Column order is insertion order and is preserved
/// through selection and export, so artifact headers are deterministic.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    names: Vec<String>,
    index: AHashMap<String, usize>,
    columns: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Creates an empty matrix from row keys.
    ///
    /// Fails when the key vectors differ in length, a ticker block repeats
    /// after another ticker interleaves, or dates within a block are not
    /// strictly increasing (which also rejects duplicate (Date, Ticker) pairs).
    pub fn from_keys(dates: Vec<NaiveDate>, tickers: Vec<String>) -> Result<Self> {
        if dates.len() != tickers.len() {
            return Err(PipelineError::config(format!(
                "row key length mismatch: {} dates vs {} tickers",
                dates.len(),
                tickers.len()
            )));
        }
        validate_keys(&dates, &tickers)?;
        Ok(Self {
            dates,
            tickers,
            names: Vec::new(),
            index: AHashMap::new(),
            columns: Vec::new(),
        })
    }

    /// Appends a named column. The name must be new and the length must match
    /// the row count.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(PipelineError::config(format!(
                "column '{}' has {} values but the matrix has {} rows",
                name,
                values.len(),
                self.dates.len()
            )));
        }
        if self.index.contains_key(&name) {
            return Err(PipelineError::config(format!(
                "column '{name}' already exists"
            )));
        }
        self.index.insert(name.clone(), self.columns.len());
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    /// Returns the values of a column, or `None` if absent.
    #[inline]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&i| self.columns[i].as_slice())
    }

    /// Mutable access to the values of a column, or `None` if absent.
    #[inline]
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.columns[i]),
            None => None,
        }
    }

    #[inline]
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Column names in insertion order.
    #[inline]
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Name/values pairs in insertion order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    #[inline]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[inline]
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Contiguous row ranges per ticker, in row order.
    pub fn ticker_spans(&self) -> Vec<(&str, Range<usize>)> {
        let mut spans: Vec<(&str, Range<usize>)> = Vec::new();
        for (i, ticker) in self.tickers.iter().enumerate() {
            match spans.last_mut() {
                Some((name, range)) if *name == ticker.as_str() => range.end = i + 1,
                _ => spans.push((ticker.as_str(), i..i + 1)),
            }
        }
        spans
    }

    /// New matrix holding the same row keys and only the requested columns,
    /// in the requested order. Fails if any name is absent.
    pub fn select(&self, names: &[String]) -> Result<FeatureMatrix> {
        let mut out = FeatureMatrix {
            dates: self.dates.clone(),
            tickers: self.tickers.clone(),
            names: Vec::with_capacity(names.len()),
            index: AHashMap::with_capacity(names.len()),
            columns: Vec::with_capacity(names.len()),
        };
        for name in names {
            let values = self.column(name).ok_or_else(|| {
                PipelineError::config(format!("cannot select missing column '{name}'"))
            })?;
            out.index.insert(name.clone(), out.columns.len());
            out.names.push(name.clone());
            out.columns.push(values.to_vec());
        }
        Ok(out)
    }

    /// Copies a contiguous row range into a new matrix with the same columns.
    pub fn slice_rows(&self, range: Range<usize>) -> Result<FeatureMatrix> {
        if range.end > self.n_rows() || range.start > range.end {
            return Err(PipelineError::config(format!(
                "row range {}..{} out of bounds for {} rows",
                range.start,
                range.end,
                self.n_rows()
            )));
        }
        let mut out = FeatureMatrix {
            dates: self.dates[range.clone()].to_vec(),
            tickers: self.tickers[range.clone()].to_vec(),
            names: self.names.clone(),
            index: self.index.clone(),
            columns: Vec::with_capacity(self.columns.len()),
        };
        for col in &self.columns {
            out.columns.push(col[range.clone()].to_vec());
        }
        Ok(out)
    }

    /// Copies the given rows into a new matrix with the same columns.
    ///
    /// Indices must be strictly ascending and in bounds; a subset taken in
    /// row order preserves the key invariant without re-validation.
    pub fn take_rows(&self, rows: &[usize]) -> Result<FeatureMatrix> {
        for (k, &i) in rows.iter().enumerate() {
            if i >= self.n_rows() {
                return Err(PipelineError::config(format!(
                    "row index {i} out of bounds for {} rows",
                    self.n_rows()
                )));
            }
            if k > 0 && rows[k - 1] >= i {
                return Err(PipelineError::config(
                    "row indices must be strictly ascending",
                ));
            }
        }
        let mut out = FeatureMatrix {
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            tickers: rows.iter().map(|&i| self.tickers[i].clone()).collect(),
            names: self.names.clone(),
            index: self.index.clone(),
            columns: Vec::with_capacity(self.columns.len()),
        };
        for col in &self.columns {
            out.columns.push(rows.iter().map(|&i| col[i]).collect());
        }
        Ok(out)
    }

    /// Rectangular numeric view over the requested columns, rows by features.
    ///
    /// This is the hand-off format at the classifier boundary: no identifier
    /// columns, one row per observation.
    pub fn to_design(&self, names: &[String]) -> Result<Array2<f64>> {
        let mut data = Array2::zeros((self.n_rows(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let values = self.column(name).ok_or_else(|| {
                PipelineError::config(format!("design matrix references missing column '{name}'"))
            })?;
            for (i, &v) in values.iter().enumerate() {
                data[[i, j]] = v;
            }
        }
        Ok(data)
    }

    /// Count of non-NaN values in a column, 0 when the column is absent.
    pub fn valid_count(&self, name: &str) -> usize {
        self.column(name)
            .map(|v| v.iter().filter(|x| !x.is_nan()).count())
            .unwrap_or(0)
    }
}

fn validate_keys(dates: &[NaiveDate], tickers: &[String]) -> Result<()> {
    let mut seen: AHashMap<&str, ()> = AHashMap::new();
    let mut i = 0;
    while i < tickers.len() {
        let ticker = tickers[i].as_str();
        if seen.insert(ticker, ()).is_some() {
            return Err(PipelineError::config(format!(
                "ticker '{ticker}' appears in non-contiguous blocks; rows must be sorted by (Ticker, Date)"
            )));
        }
        let mut j = i + 1;
        while j < tickers.len() && tickers[j] == ticker {
            if dates[j] <= dates[j - 1] {
                return Err(PipelineError::config(format!(
                    "dates for ticker '{ticker}' not strictly increasing at row {j} ({} then {})",
                    dates[j - 1],
                    dates[j]
                )));
            }
            j += 1;
        }
        i = j;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn two_ticker_matrix() -> FeatureMatrix {
        FeatureMatrix::from_keys(
            vec![day(1), day(2), day(3), day(1), day(2)],
            vec![
                "BTC".into(),
                "BTC".into(),
                "BTC".into(),
                "ETH".into(),
                "ETH".into(),
            ],
        )
        .unwrap()
    }

    // ------------------------------------------------------------------
    // Key invariant
    // ------------------------------------------------------------------

    #[test]
    fn test_rejects_duplicate_date_within_ticker() {
        let result = FeatureMatrix::from_keys(
            vec![day(1), day(1)],
            vec!["BTC".into(), "BTC".into()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_decreasing_dates() {
        let result = FeatureMatrix::from_keys(
            vec![day(2), day(1)],
            vec!["BTC".into(), "BTC".into()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_interleaved_ticker_blocks() {
        let result = FeatureMatrix::from_keys(
            vec![day(1), day(1), day(2)],
            vec!["BTC".into(), "ETH".into(), "BTC".into()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_same_date_across_tickers_is_fine() {
        assert!(two_ticker_matrix().n_rows() == 5);
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    #[test]
    fn test_push_and_read_column() {
        let mut m = two_ticker_matrix();
        m.push_column("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(m.column("x").unwrap()[3], 4.0);
        assert_eq!(m.n_columns(), 1);
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut m = two_ticker_matrix();
        assert!(m.push_column("x", vec![1.0]).is_err());
    }

    #[test]
    fn test_push_duplicate_column_fails() {
        let mut m = two_ticker_matrix();
        m.push_column("x", vec![0.0; 5]).unwrap();
        assert!(m.push_column("x", vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_valid_count_ignores_nan() {
        let mut m = two_ticker_matrix();
        m.push_column("x", vec![1.0, f64::NAN, 3.0, f64::NAN, 5.0])
            .unwrap();
        assert_eq!(m.valid_count("x"), 3);
        assert_eq!(m.valid_count("missing"), 0);
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    #[test]
    fn test_ticker_spans() {
        let m = two_ticker_matrix();
        let spans = m.ticker_spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], ("BTC", 0..3));
        assert_eq!(spans[1], ("ETH", 3..5));
    }

    #[test]
    fn test_select_preserves_order_and_keys() {
        let mut m = two_ticker_matrix();
        m.push_column("a", vec![1.0; 5]).unwrap();
        m.push_column("b", vec![2.0; 5]).unwrap();
        m.push_column("c", vec![3.0; 5]).unwrap();

        let sub = m.select(&["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(sub.column_names(), &["c".to_string(), "a".to_string()]);
        assert_eq!(sub.n_rows(), 5);
        assert_eq!(sub.tickers()[4], "ETH");
    }

    #[test]
    fn test_select_missing_column_fails() {
        let m = two_ticker_matrix();
        assert!(m.select(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_slice_rows() {
        let mut m = two_ticker_matrix();
        m.push_column("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let s = m.slice_rows(1..4).unwrap();
        assert_eq!(s.n_rows(), 3);
        assert_eq!(s.column("x").unwrap(), &[2.0, 3.0, 4.0]);
        assert_eq!(s.tickers(), &["BTC".to_string(), "BTC".to_string(), "ETH".to_string()]);
    }

    #[test]
    fn test_take_rows_subset() {
        let mut m = two_ticker_matrix();
        m.push_column("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let t = m.take_rows(&[0, 2, 4]).unwrap();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.column("x").unwrap(), &[1.0, 3.0, 5.0]);
        assert_eq!(t.tickers()[2], "ETH");
    }

    #[test]
    fn test_take_rows_rejects_unsorted_or_out_of_bounds() {
        let m = two_ticker_matrix();
        assert!(m.take_rows(&[2, 1]).is_err());
        assert!(m.take_rows(&[0, 0]).is_err());
        assert!(m.take_rows(&[5]).is_err());
    }

    #[test]
    fn test_to_design_shape_and_order() {
        let mut m = two_ticker_matrix();
        m.push_column("a", vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        m.push_column("b", vec![10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();

        let x = m.to_design(&["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(x.shape(), &[5, 2]);
        assert_eq!(x[[2, 0]], 30.0);
        assert_eq!(x[[2, 1]], 3.0);
    }
}
