use std::path::Path;

/// Test-runner adapter contract.
///
/// An adapter names the files a run needs and the command that executes the tests.
/// The sandbox stays runner-agnostic.
pub trait RunnerAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn solution_file(&self) -> &'static str;
    fn test_file(&self) -> &'static str;
    /// Runner configuration file written next to the tests, if any
    fn config_file(&self) -> Option<&'static str>;
    fn config_contents(&self) -> &'static str;
    /// Whether the test body already imports the solution module
    fn references_solution(&self, tests: &str) -> bool;
    fn import_preamble(&self) -> &'static str;
    fn command(&self, workdir: &Path) -> Vec<String>;

    /// Test body as written to disk, with the import preamble when missing
    fn prepare_tests(&self, tests: &str) -> String {
        if self.references_solution(tests) {
            tests.to_string()
        } else {
            format!("{}{}", self.import_preamble(), tests)
        }
    }
}
