//! Input Schema Module
//!
//! Contracts for the two tables the pipeline consumes (daily OHLCV keyed by
//! (Date, Ticker) and a daily sentiment index keyed by Date) plus the default
//! feature-group buckets the correlation selector works over.
//!
//! # Design Philosophy
//!
//! - **Fail fast on shape**: missing required columns abort the run before
//!   any indicator is computed
//! - **Tolerant on spelling**: common header aliases are accepted so exports
//!   from different sources load without manual renaming
//! - **Groups as data**: topic buckets are plain values that serialize into
//!   the run configuration, not hardcoded lookups

mod groups;
mod input;

pub use groups::{default_groups, FeatureGroup, ALWAYS_EXCLUDED};
pub use input::{
    load_ohlcv, load_sentiment, OhlcvSeries, SentimentSeries, REQUIRED_OHLCV_COLUMNS,
};
