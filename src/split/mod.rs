//! Candidate text shaping
//!
//! Strips markdown fences and splits the remaining text into solution and tests.

pub mod fence;
pub mod rules;
pub mod splitter;
