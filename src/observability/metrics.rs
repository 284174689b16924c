// Run counters
//
// Counters are atomic so sandbox workers can update them without a lock. The
// driver takes a plain snapshot for progress lines and the final summary.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::config::types::VerifyStatus;

/// Counter metric (monotonically increasing)
#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Increment and return the new value
    pub fn inc(&self) -> u64 {
        self.value.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for one pass over an input file
#[derive(Debug, Default)]
pub struct RunMetrics {
    /// Records that parsed as JSON objects
    pub seen: Counter,
    /// Records written to the output
    pub kept: Counter,
    pub rejected_unsafe: Counter,
    pub rejected_fail: Counter,
    /// Lines that were not JSON objects
    pub malformed: Counter,
    /// Records with no usable candidate text
    pub empty: Counter,
    /// Sandbox executions, with total wall time in microseconds
    pub executions: Counter,
    pub execution_micros: Counter,
    pub timeouts: Counter,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a final classification. Returns the new kept total for accepted records.
    pub fn record_status(&self, status: VerifyStatus) -> Option<u64> {
        match status {
            VerifyStatus::Accepted => Some(self.kept.inc()),
            VerifyStatus::RejectedUnsafe => {
                self.rejected_unsafe.inc();
                None
            }
            VerifyStatus::RejectedFail => {
                self.rejected_fail.inc();
                None
            }
        }
    }

    pub fn record_execution(&self, elapsed: Duration, timed_out: bool) {
        self.executions.inc();
        self.execution_micros.add(elapsed.as_micros() as u64);
        if timed_out {
            self.timeouts.inc();
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            seen: self.seen.get(),
            kept: self.kept.get(),
            rejected_unsafe: self.rejected_unsafe.get(),
            rejected_fail: self.rejected_fail.get(),
            malformed: self.malformed.get(),
            empty: self.empty.get(),
            executions: self.executions.get(),
            execution_micros: self.execution_micros.get(),
            timeouts: self.timeouts.get(),
        }
    }
}

/// Point-in-time copy of the run counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub seen: u64,
    pub kept: u64,
    pub rejected_unsafe: u64,
    pub rejected_fail: u64,
    pub malformed: u64,
    pub empty: u64,
    pub executions: u64,
    pub execution_micros: u64,
    pub timeouts: u64,
}

impl MetricsSnapshot {
    pub fn mean_execution(&self) -> Option<Duration> {
        if self.executions == 0 {
            None
        } else {
            Some(Duration::from_micros(self.execution_micros / self.executions))
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seen={} kept={} rejected_unsafe={} rejected_fail={} malformed={} empty={} timeouts={}",
            self.seen,
            self.kept,
            self.rejected_unsafe,
            self.rejected_fail,
            self.malformed,
            self.empty,
            self.timeouts
        )
    }
}
