/// Verdict classification
///
/// Pure functions from screening or execution results to the fields written back
/// onto a record. No I/O happens here.
use crate::config::types::{VerifyConfig, VerifyStatus, DEFAULT_ACCEPTED_LOG_CHARS, DEFAULT_REJECTED_LOG_CHARS};
use crate::exec::runner::SandboxOutcome;
use crate::record::types::Record;
use crate::safety::scanner::Violation;

/// Fields to write onto a record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerifyStatus,
    pub reason: Option<String>,
    pub logs: Option<String>,
    pub code: Option<String>,
    pub tests: Option<String>,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        self.status == VerifyStatus::Accepted
    }

    /// Replace any verification fields already on the record with this verdict
    pub fn apply(&self, record: &mut Record) {
        record.clear_verification();
        record.set("verify_status", self.status.as_str());
        if let Some(reason) = &self.reason {
            record.set("verify_reason", reason.as_str());
        }
        if let Some(logs) = &self.logs {
            record.set("verify_logs", logs.as_str());
        }
        if let Some(code) = &self.code {
            record.set("code", code.as_str());
        }
        if let Some(tests) = &self.tests {
            record.set("tests", tests.as_str());
        }
    }
}

/// Turns screening and execution results into verdicts
#[derive(Clone, Debug)]
pub struct Classifier {
    accepted_log_chars: usize,
    rejected_log_chars: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier {
            accepted_log_chars: DEFAULT_ACCEPTED_LOG_CHARS,
            rejected_log_chars: DEFAULT_REJECTED_LOG_CHARS,
        }
    }
}

impl Classifier {
    pub fn from_config(config: &VerifyConfig) -> Self {
        Classifier {
            accepted_log_chars: config.accepted_log_chars,
            rejected_log_chars: config.rejected_log_chars,
        }
    }

    /// Unsafe code is never executed, so there are no logs to keep
    pub fn from_violation(&self, violation: &Violation) -> Verdict {
        Verdict {
            status: VerifyStatus::RejectedUnsafe,
            reason: Some(violation.reason.clone()),
            logs: None,
            code: None,
            tests: None,
        }
    }

    pub fn from_execution(&self, outcome: &SandboxOutcome, code: &str, tests: &str) -> Verdict {
        if outcome.passed {
            Verdict {
                status: VerifyStatus::Accepted,
                reason: None,
                logs: Some(clip_logs(&outcome.logs, self.accepted_log_chars)),
                code: Some(code.to_string()),
                tests: Some(tests.to_string()),
            }
        } else {
            Verdict {
                status: VerifyStatus::RejectedFail,
                reason: None,
                logs: Some(clip_logs(&outcome.logs, self.rejected_log_chars)),
                code: None,
                tests: None,
            }
        }
    }
}

/// Last `max` characters of `text`, on a char boundary
pub fn tail_chars(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    match text.char_indices().nth(count - max) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Clip logs to `max` characters keeping the tail. A leading `[...] ` marker such as
/// `[timeout after 10s] ` is preserved so the cause survives clipping.
pub fn clip_logs(logs: &str, max: usize) -> String {
    if logs.chars().count() <= max {
        return logs.to_string();
    }

    let marker_len = if logs.starts_with('[') {
        logs.find("] ").map(|idx| idx + 2).unwrap_or(0)
    } else {
        0
    };
    let (marker, rest) = logs.split_at(marker_len);
    let marker_chars = marker.chars().count();

    if marker_chars >= max {
        return tail_chars(logs, max).to_string();
    }

    format!("{}{}", marker, tail_chars(rest, max - marker_chars))
}
