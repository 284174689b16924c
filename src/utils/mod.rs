//! Utilities
//!
//! Environment hygiene and bounded output collection for child processes.

pub mod env_hygiene;
pub mod output;
