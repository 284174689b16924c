//! Input records
//!
//! Parsing of JSONL lines into records and resolution of the candidate text.

pub mod extract;
pub mod types;
