//! Correlation-based feature pruning.
//!
//! Roughly forty indicator columns go in; one representative per feature
//! group comes out, chosen greedily so that no two selected columns exceed
//! a configurable |correlation| cap. The pass is deterministic and reports
//! enough detail per group (full candidate ranking at decision time) to
//! explain any selection after the fact.
//!
//! # Design Philosophy
//!
//! - **Precompute, then reduce**: the full absolute-correlation matrix is
//!   built once; group passes only index into it.
//! - **Fail soft per group**: a group with no acceptable candidate selects
//!   nothing and is reported, leaving the decision to error out (or not) to
//!   the caller, which knows whether anything downstream needed that group.
//! - **Opt-in rescue**: forcing a feature past the threshold is possible
//!   but never implicit.

mod correlation;
mod selector;

pub use correlation::CorrelationMatrix;
pub use selector::{
    select_features, ForcedKeep, GroupSelection, SelectionConfig, SelectionResult,
    DEFAULT_CORRELATION_THRESHOLD, MISSING_CORRELATION_SCORE,
};
