//! Input table contracts and loaders.
//!
//! Two tables feed the pipeline: a daily OHLCV table keyed by (Date, Ticker)
//! and a daily sentiment index keyed by Date alone. Both arrive as delimited
//! files with a header row. Schema violations here are fatal: a missing
//! required column aborts the run before any feature is computed.

use chrono::NaiveDate;
use std::path::Path;
use tracing::warn;

use crate::error::{PipelineError, Result};

/// Columns every OHLCV input must carry.
pub const REQUIRED_OHLCV_COLUMNS: [&str; 7] =
    ["Date", "Ticker", "Open", "High", "Low", "Close", "Volume"];

/// Header aliases accepted for the sentiment date column, tried in order.
const SENTIMENT_DATE_ALIASES: [&str; 7] =
    ["Date", "date", "DATA", "data", "timestamp", "Time", "time"];

/// Header aliases accepted for the sentiment value column, tried in order.
const SENTIMENT_VALUE_ALIASES: [&str; 8] = [
    "fgi",
    "FGI",
    "value",
    "Value",
    "fear_greed",
    "fearGreed",
    "index",
    "Index",
];

/// Daily price history for one ticker, sorted ascending by date.
#[derive(Debug, Clone)]
pub struct OhlcvSeries {
    pub ticker: String,
    pub dates: Vec<NaiveDate>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl OhlcvSeries {
    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Global daily sentiment index, sorted ascending by date with unique dates.
#[derive(Debug, Clone)]
pub struct SentimentSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl SentimentSeries {
    #[inline]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Exact-date lookup.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }

    /// Left join against a date sequence: one value per input date,
    /// `NaN` where the sentiment table has no row for that date.
    pub fn join_left(&self, dates: &[NaiveDate]) -> Vec<f64> {
        dates
            .iter()
            .map(|d| self.value_on(*d).unwrap_or(f64::NAN))
            .collect()
    }
}

struct OhlcvRow {
    date: NaiveDate,
    ticker: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Loads an OHLCV table, returning one series per ticker sorted by
/// (ticker, date), with exact duplicate (Date, Ticker) rows dropped.
pub fn load_ohlcv(path: impl AsRef<Path>) -> Result<Vec<OhlcvSeries>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let headers = reader.headers()?.clone();

    let idx = |name: &str| -> Result<usize> {
        find_column(&headers, name).ok_or_else(|| PipelineError::MissingRequiredColumn {
            column: name.to_string(),
            table: "ohlcv".to_string(),
        })
    };
    let (c_date, c_ticker) = (idx("Date")?, idx("Ticker")?);
    let (c_open, c_high, c_low) = (idx("Open")?, idx("High")?, idx("Low")?);
    let (c_close, c_volume) = (idx("Close")?, idx("Volume")?);

    let mut rows: Vec<OhlcvRow> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(OhlcvRow {
            date: parse_date(record.get(c_date).unwrap_or(""))?,
            ticker: record.get(c_ticker).unwrap_or("").trim().to_string(),
            open: parse_value(record.get(c_open).unwrap_or(""))?,
            high: parse_value(record.get(c_high).unwrap_or(""))?,
            low: parse_value(record.get(c_low).unwrap_or(""))?,
            close: parse_value(record.get(c_close).unwrap_or(""))?,
            volume: parse_value(record.get(c_volume).unwrap_or(""))?,
        });
    }

    rows.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));

    let mut out: Vec<OhlcvSeries> = Vec::new();
    for row in rows {
        if let Some(series) = out.last_mut() {
            if series.ticker == row.ticker {
                if series.dates.last() == Some(&row.date) {
                    warn!(ticker = %row.ticker, date = %row.date, "duplicate OHLCV row dropped");
                    continue;
                }
                series.dates.push(row.date);
                series.open.push(row.open);
                series.high.push(row.high);
                series.low.push(row.low);
                series.close.push(row.close);
                series.volume.push(row.volume);
                continue;
            }
        }
        out.push(OhlcvSeries {
            ticker: row.ticker,
            dates: vec![row.date],
            open: vec![row.open],
            high: vec![row.high],
            low: vec![row.low],
            close: vec![row.close],
            volume: vec![row.volume],
        });
    }
    Ok(out)
}

/// Loads the sentiment index, accepting the common header spellings for the
/// date and value columns. Sorted by date, duplicate dates keep the first row.
pub fn load_sentiment(path: impl AsRef<Path>) -> Result<SentimentSeries> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let headers = reader.headers()?.clone();

    let c_date = SENTIMENT_DATE_ALIASES
        .iter()
        .find_map(|name| find_exact_column(&headers, name))
        .ok_or_else(|| PipelineError::MissingRequiredColumn {
            column: "Date".to_string(),
            table: "sentiment".to_string(),
        })?;
    let c_value = SENTIMENT_VALUE_ALIASES
        .iter()
        .find_map(|name| find_exact_column(&headers, name))
        .ok_or_else(|| PipelineError::MissingRequiredColumn {
            column: "fgi".to_string(),
            table: "sentiment".to_string(),
        })?;

    let mut rows: Vec<(NaiveDate, f64)> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let date = parse_date(record.get(c_date).unwrap_or(""))?;
        let value = parse_value(record.get(c_value).unwrap_or(""))?;
        rows.push((date, value));
    }
    rows.sort_by_key(|(d, _)| *d);
    rows.dedup_by_key(|(d, _)| *d);

    let (dates, values) = rows.into_iter().unzip();
    Ok(SentimentSeries { dates, values })
}

/// Case-insensitive header lookup, exact match preferred.
fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    find_exact_column(headers, name).or_else(|| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

fn find_exact_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn parse_date(field: &str) -> Result<NaiveDate> {
    let field = field.trim();
    // Accept plain dates and datetime strings with a time suffix.
    let date_part = field.split(&[' ', 'T'][..]).next().unwrap_or(field);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| PipelineError::config(format!("unparseable date '{field}': {e}")))
}

fn parse_value(field: &str) -> Result<f64> {
    let field = field.trim();
    if field.is_empty() || field.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    field
        .parse::<f64>()
        .map_err(|e| PipelineError::config(format!("unparseable numeric value '{field}': {e}")))
}
