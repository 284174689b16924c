//! Test-runner adapters.
//!
//! The sandbox stays runner-agnostic. Adapters define file names, runner config
//! and the command line for each supported runner.

pub mod adapter;
pub mod pytest;

use crate::config::types::{Result, VerifyError};
use adapter::RunnerAdapter;
use pytest::PytestAdapter;

pub fn adapter_for(name: &str, interpreter: &str) -> Result<Box<dyn RunnerAdapter>> {
    match name {
        "pytest" | "py.test" => Ok(Box::new(PytestAdapter::new(interpreter))),
        _ => Err(VerifyError::Config(format!(
            "unsupported test runner adapter: {name}"
        ))),
    }
}
