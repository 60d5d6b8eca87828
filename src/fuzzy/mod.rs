//! Fuzzy linguistic encoding of the selected features.
//!
//! Each feature group's representative is re-expressed as three membership
//! degrees in [0, 1] (for example bear / neutral / bull), anchored to
//! quantiles of the feature's own history. The resulting fifteen-column
//! table is an alternative model input with a fixed schema: label names
//! depend on the family bound to the group, never on which feature won.
//!
//! # Design Philosophy
//!
//! - **Distribution-relative**: anchors come from the data, so the same
//!   code fuzzifies momentum in basis points or volatility in percent.
//! - **Shape per family, not per feature**: five families cover the five
//!   built-in groups; binding a different family to a group is a config
//!   change, not a code change.
//! - **No row loss**: missing values are median-filled so the fuzzy table
//!   keeps the exact row set of its source.

mod encoder;
mod membership;

pub use encoder::{
    default_assignments, encode, FamilyAssignment, FuzzyConfig, MembershipSet, ANCHOR_PROBS,
};
pub use membership::{gaussian, trapezoidal, triangular, MembershipFamily};
