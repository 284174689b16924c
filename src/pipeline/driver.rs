/// Record-by-record verification driver
///
/// Reads JSONL input, takes each record through extraction, splitting, screening
/// and execution, and streams accepted records to the output as they are decided.
use crate::config::types::{Result, VerifyConfig, VerifyError, VerifyStatus};
use crate::exec::runner::{ExecCause, SandboxRunner, TestExecutor};
use crate::exec::signal;
use crate::observability::metrics::{MetricsSnapshot, RunMetrics};
use crate::pipeline::stream::StreamWriter;
use crate::record::extract::CandidateSource;
use crate::record::types::Record;
use crate::safety::denylist::Denylist;
use crate::safety::scanner::SafetyScanner;
use crate::split::fence::strip_code_fences;
use crate::split::splitter::CodeTestSplitter;
use crate::verdict::classifier::Classifier;
use log::{debug, info, warn};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Why a record never reached classification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No candidate text, or nothing left once fences and tests are removed
    EmptyCandidate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyCandidate => write!(f, "empty candidate"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Skipped(SkipReason),
    Verified(VerifyStatus),
}

pub struct Pipeline {
    splitter: CodeTestSplitter,
    scanner: SafetyScanner,
    classifier: Classifier,
    executor: Arc<dyn TestExecutor>,
    metrics: RunMetrics,
    progress_every: u64,
    workers: usize,
}

impl Pipeline {
    pub fn new(config: &VerifyConfig, executor: Arc<dyn TestExecutor>) -> Result<Self> {
        let denylist = Denylist::from_config(config);
        Ok(Pipeline {
            splitter: CodeTestSplitter::with_default_rules()?,
            scanner: SafetyScanner::new(&denylist)?,
            classifier: Classifier::from_config(config),
            executor,
            metrics: RunMetrics::new(),
            progress_every: config.progress_every.max(1),
            workers: config.workers.max(1),
        })
    }

    /// Pipeline backed by the real sandbox runner
    pub fn from_config(config: &VerifyConfig) -> Result<Self> {
        let runner = SandboxRunner::from_config(config)?;
        Self::new(config, Arc::new(runner))
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Verify one record in place. Unsafe code never reaches the executor.
    pub fn verify(&self, record: &mut Record) -> RecordOutcome {
        let source = CandidateSource::detect(record);
        let origin = source.label();
        let payload = strip_code_fences(&source.into_text());
        if payload.trim().is_empty() {
            return RecordOutcome::Skipped(SkipReason::EmptyCandidate);
        }

        let split = self.splitter.split(&payload);
        if split.code.is_empty() {
            return RecordOutcome::Skipped(SkipReason::EmptyCandidate);
        }
        debug!(
            "Record {}: candidate from '{}', split by {}",
            record.id_label(),
            origin,
            split.rule.unwrap_or("smoke test")
        );

        let verdict = match self.scanner.scan(&split.code) {
            Some(violation) => self.classifier.from_violation(&violation),
            None => {
                let outcome = self.executor.execute(&split.code, &split.tests);
                self.metrics
                    .record_execution(outcome.elapsed, outcome.cause == ExecCause::TimedOut);
                self.classifier
                    .from_execution(&outcome, &split.code, &split.tests)
            }
        };

        verdict.apply(record);
        RecordOutcome::Verified(verdict.status)
    }

    /// Verify every record in `input`, streaming accepted ones to `output`.
    /// Only input, output, or writer failures are errors.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<MetricsSnapshot> {
        let file = File::open(input).map_err(|e| {
            VerifyError::fatal(format!("Failed to open input {}", input.display()), e)
        })?;
        let writer = Mutex::new(StreamWriter::create(output)?);
        let reader = BufReader::new(file);

        if self.workers <= 1 {
            self.run_sequential(reader, &writer)?;
        } else {
            self.run_parallel(reader, &writer)?;
        }

        Ok(self.metrics.snapshot())
    }

    fn run_sequential<R: BufRead>(&self, reader: R, writer: &Mutex<StreamWriter>) -> Result<()> {
        each_line(reader, |line_no, raw| {
            if let Some(record) = self.admit(line_no, raw) {
                self.settle(line_no, record, writer)?;
            }
            Ok(ControlFlow::Continue(()))
        })
    }

    fn run_parallel<R: BufRead>(&self, reader: R, writer: &Mutex<StreamWriter>) -> Result<()> {
        let (tx, rx) = crossbeam_channel::bounded::<(usize, Record)>(self.workers * 2);
        let failure: Mutex<Option<VerifyError>> = Mutex::new(None);
        let failed = AtomicBool::new(false);

        let read_result = thread::scope(|scope| {
            for _ in 0..self.workers {
                let rx = rx.clone();
                let failure = &failure;
                let failed = &failed;
                scope.spawn(move || {
                    for (line_no, record) in rx.iter() {
                        if signal::shutdown_requested() {
                            break;
                        }
                        if let Err(e) = self.settle(line_no, record, writer) {
                            failed.store(true, Ordering::SeqCst);
                            if let Ok(mut slot) = failure.lock() {
                                slot.get_or_insert(e);
                            }
                            break;
                        }
                    }
                });
            }
            drop(rx);

            let result = each_line(reader, |line_no, raw| {
                if failed.load(Ordering::SeqCst) {
                    return Ok(ControlFlow::Break(()));
                }
                if let Some(record) = self.admit(line_no, raw) {
                    if tx.send((line_no, record)).is_err() {
                        return Ok(ControlFlow::Break(()));
                    }
                }
                Ok(ControlFlow::Continue(()))
            });
            drop(tx);
            result
        });

        if let Some(err) = failure.into_inner().ok().flatten() {
            return Err(err);
        }
        read_result
    }

    /// Parse one raw line. Blank lines vanish; malformed ones are counted and skipped.
    fn admit(&self, line_no: usize, raw: &[u8]) -> Option<Record> {
        let line = match std::str::from_utf8(raw) {
            Ok(text) => text.trim_start_matches('\u{feff}').trim(),
            Err(e) => {
                warn!("Skipping line {}: invalid UTF-8 ({})", line_no, e);
                self.metrics.malformed.inc();
                return None;
            }
        };
        if line.is_empty() {
            return None;
        }

        match Record::from_line(line, line_no) {
            Ok(record) => {
                self.metrics.seen.inc();
                Some(record)
            }
            Err(e) => {
                warn!("{}, skipping", e);
                self.metrics.malformed.inc();
                None
            }
        }
    }

    fn settle(&self, line_no: usize, mut record: Record, writer: &Mutex<StreamWriter>) -> Result<()> {
        match self.verify(&mut record) {
            RecordOutcome::Skipped(reason) => {
                self.metrics.empty.inc();
                warn!("Record {} at line {}: {}, skipping", record.id_label(), line_no, reason);
            }
            RecordOutcome::Verified(status) => {
                debug!(
                    "Record {} at line {}: {}{}",
                    record.id_label(),
                    line_no,
                    status,
                    record
                        .get_str("verify_reason")
                        .map(|r| format!(" ({})", r))
                        .unwrap_or_default()
                );
                if let Some(kept) = self.metrics.record_status(status) {
                    writer
                        .lock()
                        .map_err(|_| VerifyError::Process("output writer lock poisoned".to_string()))?
                        .write_record(&record)?;
                    if kept % self.progress_every == 0 {
                        info!("[OK] kept={} / total={}", kept, self.metrics.seen.get());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Feed raw lines to `handle` until EOF, a break, or a shutdown request
fn each_line<R, F>(mut reader: R, mut handle: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(usize, &[u8]) -> Result<ControlFlow<()>>,
{
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        if signal::shutdown_requested() {
            warn!("Shutdown requested, no further records will be read after line {}", line_no);
            break;
        }

        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| VerifyError::fatal("Failed to read input", e))?;
        if n == 0 {
            break;
        }
        line_no += 1;

        if handle(line_no, &buf)?.is_break() {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::runner::SandboxOutcome;
    use std::time::Duration;

    /// Passes unless the tests contain `assert False`; remembers every call
    #[derive(Default)]
    struct SpyExecutor {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl TestExecutor for SpyExecutor {
        fn execute(&self, code: &str, tests: &str) -> SandboxOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((code.to_string(), tests.to_string()));
            let passed = !tests.contains("assert False");
            SandboxOutcome {
                passed,
                logs: "[duration_ms=1] spy".to_string(),
                cause: if passed {
                    ExecCause::Passed
                } else {
                    ExecCause::Failed {
                        exit_code: Some(1),
                        signal: None,
                    }
                },
                elapsed: Duration::from_millis(1),
            }
        }
    }

    fn pipeline() -> (Pipeline, Arc<SpyExecutor>) {
        let spy = Arc::new(SpyExecutor::default());
        let pipeline = Pipeline::new(&VerifyConfig::default(), spy.clone()).unwrap();
        (pipeline, spy)
    }

    #[test]
    fn test_accepts_add_scenario() {
        let (pipeline, spy) = pipeline();
        let mut record = Record::from_line(
            r#"{"id":1,"output":"def add(a,b): return a+b\ndef test_add(): assert add(1,2)==3"}"#,
            1,
        )
        .unwrap();

        assert_eq!(pipeline.verify(&mut record), RecordOutcome::Verified(VerifyStatus::Accepted));
        assert_eq!(record.get_str("code"), Some("def add(a,b): return a+b"));
        assert_eq!(record.get_str("tests"), Some("def test_add(): assert add(1,2)==3"));
        assert_eq!(spy.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unsafe_never_executes() {
        let (pipeline, spy) = pipeline();
        let mut record =
            Record::from_line(r#"{"id":2,"output":"import socket\ndef f(): pass"}"#, 1).unwrap();

        assert_eq!(
            pipeline.verify(&mut record),
            RecordOutcome::Verified(VerifyStatus::RejectedUnsafe)
        );
        assert!(record.get_str("verify_reason").unwrap().contains("socket"));
        assert!(spy.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_tests_rejected() {
        let (pipeline, _spy) = pipeline();
        let mut record =
            Record::from_line(r#"{"output":"def f(): return 1\ndef test_f(): assert False"}"#, 9).unwrap();

        assert_eq!(
            pipeline.verify(&mut record),
            RecordOutcome::Verified(VerifyStatus::RejectedFail)
        );
        assert!(record.get("code").is_none());
        assert_eq!(record.get_str("verify_logs"), Some("[duration_ms=1] spy"));
    }

    #[test]
    fn test_empty_candidates_skipped() {
        let (pipeline, spy) = pipeline();
        for line in [r#"{"id":3}"#, r#"{"output":"   "}"#, r#"{"output":"```python\n```"}"#] {
            let mut record = Record::from_line(line, 1).unwrap();
            assert_eq!(
                pipeline.verify(&mut record),
                RecordOutcome::Skipped(SkipReason::EmptyCandidate)
            );
        }
        assert!(spy.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_each_line_counts_lines() {
        let input = b"a\n\nb\nc".to_vec();
        let mut seen = Vec::new();
        each_line(&input[..], |line_no, raw| {
            seen.push((line_no, String::from_utf8_lossy(raw).trim().to_string()));
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                (1, "a".to_string()),
                (2, String::new()),
                (3, "b".to_string()),
                (4, "c".to_string())
            ]
        );
    }
}
