//! Execution control
//!
//! Supervised child processes, the sandbox runner built on them, and interruption handling.

pub mod runner;
pub mod signal;
pub mod supervisor;
