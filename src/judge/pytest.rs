use crate::judge::adapter::RunnerAdapter;
use crate::split::splitter::SOLUTION_MODULE;
use std::path::Path;

const PYTEST_INI: &str =
    "[pytest]\naddopts = --maxfail=1 --disable-warnings -q -p no:cacheprovider\n";

const PREAMBLE: &str = "from solution import *\nimport solution\n";

/// Runs `pytest` through the configured interpreter
#[derive(Debug, Clone)]
pub struct PytestAdapter {
    interpreter: String,
}

impl PytestAdapter {
    pub fn new(interpreter: impl Into<String>) -> Self {
        PytestAdapter {
            interpreter: interpreter.into(),
        }
    }
}

impl Default for PytestAdapter {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl RunnerAdapter for PytestAdapter {
    fn name(&self) -> &'static str {
        "pytest"
    }

    fn solution_file(&self) -> &'static str {
        "solution.py"
    }

    fn test_file(&self) -> &'static str {
        "test_solution.py"
    }

    fn config_file(&self) -> Option<&'static str> {
        Some("pytest.ini")
    }

    fn config_contents(&self) -> &'static str {
        PYTEST_INI
    }

    fn references_solution(&self, tests: &str) -> bool {
        tests.contains(&format!("import {}", SOLUTION_MODULE))
            || tests.contains(&format!("from {}", SOLUTION_MODULE))
    }

    fn import_preamble(&self) -> &'static str {
        PREAMBLE
    }

    fn command(&self, workdir: &Path) -> Vec<String> {
        vec![
            self.interpreter.clone(),
            "-m".to_string(),
            "pytest".to_string(),
            "--rootdir".to_string(),
            workdir.to_string_lossy().to_string(),
            self.test_file().to_string(),
        ]
    }
}
