//! verifybox: static screening and sandboxed test execution for generated code
//!
//! Reads JSONL records holding model-produced solutions, separates solution code
//! from its tests, rejects code that touches the network, processes or the host
//! filesystem, runs the rest under pytest in a throwaway directory, and keeps only
//! the records whose tests pass.
//!
//! # Architecture
//!
//! ## Records ([`record`])
//! - [`record::types`]: JSONL record wrapper that preserves upstream fields
//! - [`record::extract`]: Candidate text resolution across producer shapes
//!
//! ## Splitting ([`split`])
//! - [`split::fence`]: Markdown fence removal
//! - [`split::rules`]: Ordered code/test boundary rules
//! - [`split::splitter`]: First-match splitting with a synthesized smoke test
//!
//! ## Safety ([`safety`])
//! - [`safety::denylist`]: Banned modules and call prefixes
//! - [`safety::scanner`]: First-hit static screening of solution code
//! - [`safety::workspace`]: Exclusive per-execution directories
//!
//! ## Execution ([`exec`], [`judge`])
//! - [`exec::supervisor`]: Process-group supervision with deadline and reaping
//! - [`exec::runner`]: Sandbox runner behind the [`exec::runner::TestExecutor`] seam
//! - [`exec::signal`]: Async-safe interruption flag
//! - [`judge`]: Test-runner adapters (pytest)
//!
//! ## Verdicts and output ([`verdict`], [`pipeline`])
//! - [`verdict::classifier`]: Status, reason and clipped logs per record
//! - [`pipeline::stream`]: Flushed JSONL output
//! - [`pipeline::driver`]: Sequential or pooled processing of an input file
//!
//! ## Support
//! - [`config`]: Typed configuration, JSON loading, startup validation
//! - [`observability::metrics`]: Run counters
//! - [`utils`]: Environment hygiene and bounded output collection
//!
//! # Guarantees
//!
//! 1. **Screen before run** - code that fails screening is never executed
//! 2. **Nothing outlives a record** - child process groups are killed and reaped,
//!    workspaces removed, on every exit path
//! 3. **Stream as you go** - accepted records are flushed as soon as they are decided

// Records
pub mod record;

// Code/test splitting
pub mod split;

// Static screening and workspaces
pub mod safety;

// Execution Control
pub mod exec;

// Test-runner adapters
pub mod judge;

// Verdicts
pub mod verdict;

// Input/output driving
pub mod pipeline;

// Observability
pub mod observability;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the verifybox binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::*;
pub use pipeline::driver::{Pipeline, RecordOutcome};
pub use record::types::Record;
