/// Core types shared across the verification pipeline
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default per-record test timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum solution size accepted by the safety scanner (characters)
pub const DEFAULT_MAX_CODE_CHARS: usize = 100_000;

/// Log budget for accepted records (characters, tail kept)
pub const DEFAULT_ACCEPTED_LOG_CHARS: usize = 2_000;

/// Log budget for records rejected after execution (characters, tail kept)
pub const DEFAULT_REJECTED_LOG_CHARS: usize = 4_000;

/// Terminal classification of a verified record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    /// Tests ran and passed
    Accepted,
    /// Static screening found a denylisted construct; never executed
    RejectedUnsafe,
    /// Tests ran and failed, timed out, or could not be started
    RejectedFail,
}

impl VerifyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyStatus::Accepted => "accepted",
            VerifyStatus::RejectedUnsafe => "rejected_unsafe",
            VerifyStatus::RejectedFail => "rejected_fail",
        }
    }
}

impl std::fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integrity of the captured child output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputIntegrity {
    /// Whole stream captured
    Complete,
    /// Stream exceeded the capture budget; only the tail was kept
    TruncatedHead,
    /// Collector gave up waiting for the stream to close
    CollectionTimedOut,
    /// Reading the stream failed part way
    ReadError,
}

impl std::fmt::Display for OutputIntegrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputIntegrity::Complete => write!(f, "complete"),
            OutputIntegrity::TruncatedHead => write!(f, "truncated_head"),
            OutputIntegrity::CollectionTimedOut => write!(f, "collection_timed_out"),
            OutputIntegrity::ReadError => write!(f, "read_error"),
        }
    }
}

/// Run configuration. Every field has a default so partial config files work.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Hard wall-clock limit for one test run
    pub timeout_secs: u64,
    /// Size ceiling for solution code
    pub max_code_chars: usize,
    /// Log tail kept on accepted records
    pub accepted_log_chars: usize,
    /// Log tail kept on records rejected after execution
    pub rejected_log_chars: usize,
    /// Emit a progress line every N accepted records
    pub progress_every: u64,
    /// Number of concurrent sandbox workers (1 = sequential, ordered output)
    pub workers: usize,
    /// Test runner adapter name
    pub runner: String,
    /// Interpreter used to launch the test runner
    pub python: String,
    /// Delay between SIGTERM and SIGKILL when a run is cut short
    pub kill_grace_ms: u64,
    /// Bytes of child output retained in memory (tail)
    pub output_capture_bytes: usize,
    /// How long to wait for the output pipe to drain after the child exits
    pub output_collection_timeout_ms: u64,
    /// Parent directory for per-record workspaces (system temp dir when unset)
    pub workspace_root: Option<PathBuf>,
    /// Replaces the built-in import denylist when set
    pub banned_imports: Option<Vec<String>>,
    /// Replaces the built-in API call-prefix denylist when set
    pub banned_apis: Option<Vec<String>>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_code_chars: DEFAULT_MAX_CODE_CHARS,
            accepted_log_chars: DEFAULT_ACCEPTED_LOG_CHARS,
            rejected_log_chars: DEFAULT_REJECTED_LOG_CHARS,
            progress_every: 50,
            workers: 1,
            runner: "pytest".to_string(),
            python: "python3".to_string(),
            kill_grace_ms: 200,
            output_capture_bytes: 1024 * 1024,
            output_collection_timeout_ms: 2_000,
            workspace_root: None,
            banned_imports: None,
            banned_apis: None,
        }
    }
}

impl VerifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn output_collection_timeout(&self) -> Duration {
        Duration::from_millis(self.output_collection_timeout_ms)
    }

    /// Directory under which run workspaces are created
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Error types for verifybox
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },

    #[error("{context}: {source}")]
    Fatal {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl VerifyError {
    /// Wrap an IO failure that must abort the whole run
    pub fn fatal(context: impl Into<String>, source: std::io::Error) -> Self {
        VerifyError::Fatal {
            context: context.into(),
            source,
        }
    }
}

impl From<nix::errno::Errno> for VerifyError {
    fn from(err: nix::errno::Errno) -> Self {
        VerifyError::Process(err.to_string())
    }
}

/// Result type alias for verifybox operations
pub type Result<T> = std::result::Result<T, VerifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&VerifyStatus::RejectedUnsafe).unwrap();
        assert_eq!(json, "\"rejected_unsafe\"");
        assert_eq!(VerifyStatus::Accepted.to_string(), "accepted");
        assert_eq!(VerifyStatus::RejectedFail.as_str(), "rejected_fail");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: VerifyConfig = serde_json::from_str(r#"{"timeout_secs": 3}"#).unwrap();
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.max_code_chars, DEFAULT_MAX_CODE_CHARS);
        assert_eq!(config.workers, 1);
        assert_eq!(config.runner, "pytest");
        assert!(config.banned_imports.is_none());
    }

    #[test]
    fn test_output_integrity_display() {
        assert_eq!(format!("{}", OutputIntegrity::Complete), "complete");
        assert_eq!(format!("{}", OutputIntegrity::TruncatedHead), "truncated_head");
        assert_eq!(
            format!("{}", OutputIntegrity::CollectionTimedOut),
            "collection_timed_out"
        );
        assert_eq!(format!("{}", OutputIntegrity::ReadError), "read_error");
    }
}
