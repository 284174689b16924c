//! Safety
//!
//! Static screening of candidate code and run-scoped workspaces.

pub mod denylist;
pub mod scanner;
pub mod workspace;
