//! Verdict classification
//!
//! Maps screening violations and sandbox outcomes onto record fields.

pub mod classifier;
