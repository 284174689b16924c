//! Verification pipeline
//!
//! Drives records from the input file through verification and streams accepted
//! ones to the output.

pub mod driver;
pub mod stream;
