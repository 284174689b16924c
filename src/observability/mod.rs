//! Observability
//!
//! Run counters surfaced through progress lines and the final summary.

pub mod metrics;
