/// Sandboxed test execution for one code/test pair
///
/// Every call gets a fresh workspace that is removed before returning. Failures of
/// any kind come back as a failed `SandboxOutcome`; nothing here aborts the run.
use crate::config::types::{Result, VerifyConfig, VerifyError};
use crate::exec::supervisor::{self, LaunchOutcome, LaunchSpec, Termination};
use crate::judge::{self, adapter::RunnerAdapter};
use crate::safety::workspace::Workspace;
use crate::utils::env_hygiene::EnvHygiene;
use crate::utils::output::OutputLimits;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// How an execution ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecCause {
    Passed,
    Failed {
        exit_code: Option<i32>,
        signal: Option<i32>,
    },
    TimedOut,
    Interrupted,
    /// Workspace or child could not be created
    SpawnError,
}

#[derive(Clone, Debug)]
pub struct SandboxOutcome {
    pub passed: bool,
    pub logs: String,
    pub cause: ExecCause,
    /// Wall time of the child; zero when it never started
    pub elapsed: Duration,
}

impl SandboxOutcome {
    fn error(err: impl std::fmt::Display) -> Self {
        SandboxOutcome {
            passed: false,
            logs: format!("[error] {}", err),
            cause: ExecCause::SpawnError,
            elapsed: Duration::ZERO,
        }
    }
}

/// Executes tests against a solution. The pipeline only depends on this seam.
pub trait TestExecutor: Send + Sync {
    fn execute(&self, code: &str, tests: &str) -> SandboxOutcome;
}

/// Runs tests in a throwaway workspace under a supervised child process
pub struct SandboxRunner {
    adapter: Box<dyn RunnerAdapter>,
    environment: BTreeMap<String, String>,
    workspace_root: PathBuf,
    timeout: Duration,
    kill_grace: Duration,
    output: OutputLimits,
}

impl SandboxRunner {
    pub fn new(adapter: Box<dyn RunnerAdapter>, config: &VerifyConfig) -> Self {
        SandboxRunner {
            adapter,
            environment: EnvHygiene::default().child_environment(),
            workspace_root: config.workspace_root(),
            timeout: config.timeout(),
            kill_grace: config.kill_grace(),
            output: OutputLimits {
                capture_bytes: config.output_capture_bytes,
                collection_timeout: config.output_collection_timeout(),
            },
        }
    }

    pub fn from_config(config: &VerifyConfig) -> Result<Self> {
        let adapter = judge::adapter_for(&config.runner, &config.python)?;
        Ok(Self::new(adapter, config))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn prepare(&self, workspace: &mut Workspace, code: &str, tests: &str) -> Result<LaunchSpec> {
        workspace.write_file(self.adapter.solution_file(), code)?;
        workspace.write_file(self.adapter.test_file(), &self.adapter.prepare_tests(tests))?;
        if let Some(config_file) = self.adapter.config_file() {
            workspace.write_file(config_file, self.adapter.config_contents())?;
        }

        let mut argv = self.adapter.command(workspace.run_dir()).into_iter();
        let program = argv.next().ok_or_else(|| {
            VerifyError::Config(format!("{} adapter produced an empty command", self.adapter.name()))
        })?;
        Ok(LaunchSpec {
            program,
            args: argv.collect(),
            workdir: workspace.run_dir().to_path_buf(),
            environment: self.environment.clone(),
            wall_limit: self.timeout,
            kill_grace: self.kill_grace,
            output: self.output.clone(),
            cancel: None,
        })
    }

    fn summarize(&self, outcome: LaunchOutcome) -> SandboxOutcome {
        match outcome.termination {
            Termination::WallTimeout => SandboxOutcome {
                passed: false,
                logs: format!("[timeout after {}s] {}", self.timeout.as_secs(), outcome.output),
                cause: ExecCause::TimedOut,
                elapsed: outcome.wall_time,
            },
            Termination::Interrupted => SandboxOutcome {
                passed: false,
                logs: format!("[interrupted] {}", outcome.output),
                cause: ExecCause::Interrupted,
                elapsed: outcome.wall_time,
            },
            Termination::Exited => {
                let passed = outcome.success();
                let cause = if passed {
                    ExecCause::Passed
                } else {
                    ExecCause::Failed {
                        exit_code: outcome.exit_code,
                        signal: outcome.term_signal,
                    }
                };
                SandboxOutcome {
                    passed,
                    logs: format!(
                        "[duration_ms={}] {}",
                        outcome.wall_time.as_millis(),
                        outcome.output
                    ),
                    cause,
                    elapsed: outcome.wall_time,
                }
            }
        }
    }
}

impl TestExecutor for SandboxRunner {
    fn execute(&self, code: &str, tests: &str) -> SandboxOutcome {
        let mut workspace = match Workspace::create(&self.workspace_root) {
            Ok(workspace) => workspace,
            Err(e) => return SandboxOutcome::error(e),
        };

        let result = self
            .prepare(&mut workspace, code, tests)
            .and_then(|spec| supervisor::launch(&spec));

        if let Err(e) = workspace.cleanup() {
            log::warn!("Failed to remove workspace {}: {}", workspace.run_dir().display(), e);
        }

        match result {
            Ok(outcome) => {
                log::debug!(
                    "{} finished in {}ms ({:?}, exit {:?}, output {})",
                    self.adapter.name(),
                    outcome.wall_time.as_millis(),
                    outcome.termination,
                    outcome.exit_code,
                    outcome.output_integrity
                );
                self.summarize(outcome)
            }
            Err(e) => {
                log::warn!("Sandbox execution failed to start: {}", e);
                SandboxOutcome::error(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::adapter::RunnerAdapter;
    use std::path::Path;

    /// Runs the test file with `/bin/sh` so the sandbox can be tested without Python
    struct ShellAdapter;

    impl RunnerAdapter for ShellAdapter {
        fn name(&self) -> &'static str {
            "sh"
        }
        fn solution_file(&self) -> &'static str {
            "solution.sh"
        }
        fn test_file(&self) -> &'static str {
            "test.sh"
        }
        fn config_file(&self) -> Option<&'static str> {
            None
        }
        fn config_contents(&self) -> &'static str {
            ""
        }
        fn references_solution(&self, tests: &str) -> bool {
            tests.contains("solution.sh")
        }
        fn import_preamble(&self) -> &'static str {
            ". ./solution.sh\n"
        }
        fn command(&self, _workdir: &Path) -> Vec<String> {
            vec!["/bin/sh".to_string(), "test.sh".to_string()]
        }
    }

    fn runner(root: &Path, timeout_secs: u64) -> SandboxRunner {
        let config = VerifyConfig {
            timeout_secs,
            workspace_root: Some(root.to_path_buf()),
            ..VerifyConfig::default()
        };
        SandboxRunner::new(Box::new(ShellAdapter), &config)
    }

    fn leftover_entries(root: &Path) -> usize {
        std::fs::read_dir(root).unwrap().count()
    }

    #[test]
    fn test_pass_has_duration_prefix() {
        let root = tempfile::tempdir().unwrap();
        let outcome = runner(root.path(), 10).execute("X=1", "[ \"$X\" = 1 ] && echo ok");
        assert!(outcome.passed, "{}", outcome.logs);
        assert_eq!(outcome.cause, ExecCause::Passed);
        assert!(outcome.logs.starts_with("[duration_ms="));
        assert!(outcome.logs.contains("ok"));
        assert_eq!(leftover_entries(root.path()), 0);
    }

    #[test]
    fn test_failure_keeps_output() {
        let root = tempfile::tempdir().unwrap();
        let outcome = runner(root.path(), 10).execute("X=1", "echo boom; exit 1");
        assert!(!outcome.passed);
        assert!(matches!(outcome.cause, ExecCause::Failed { exit_code: Some(1), .. }));
        assert!(outcome.logs.contains("boom"));
        assert_eq!(leftover_entries(root.path()), 0);
    }

    #[test]
    fn test_timeout_reports_limit_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let outcome = runner(root.path(), 1).execute("", "sleep 30");
        assert!(!outcome.passed);
        assert_eq!(outcome.cause, ExecCause::TimedOut);
        assert!(outcome.logs.starts_with("[timeout after 1s]"));
        assert_eq!(leftover_entries(root.path()), 0);
    }

    #[test]
    fn test_missing_workspace_root_is_error_outcome() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("absent");
        let outcome = runner(&missing, 10).execute("", "exit 0");
        assert!(!outcome.passed);
        assert_eq!(outcome.cause, ExecCause::SpawnError);
        assert!(outcome.logs.starts_with("[error] "));
    }

    #[test]
    fn test_unknown_runner_rejected() {
        let config = VerifyConfig {
            runner: "nose".to_string(),
            ..VerifyConfig::default()
        };
        assert!(SandboxRunner::from_config(&config).is_err());
    }
}
