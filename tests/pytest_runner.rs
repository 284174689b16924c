//! End-to-end tests against a real Python interpreter with pytest
//!
//! Each test returns early when `python3 -m pytest` is unavailable on the host.

use std::fs;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;
use verifybox::exec::runner::{ExecCause, SandboxRunner, TestExecutor};
use verifybox::{Pipeline, VerifyConfig};

fn pytest_available() -> bool {
    let available = Command::new("python3")
        .args(["-m", "pytest", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !available {
        eprintln!("python3 with pytest not found, skipping");
    }
    available
}

fn runner(root: &std::path::Path, timeout_secs: u64) -> SandboxRunner {
    let config = VerifyConfig {
        timeout_secs,
        workspace_root: Some(root.to_path_buf()),
        ..VerifyConfig::default()
    };
    SandboxRunner::from_config(&config).unwrap()
}

#[test]
fn test_passing_tests_accepted() {
    if !pytest_available() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let outcome = runner(root.path(), 30).execute(
        "def add(a,b): return a+b",
        "def test_add(): assert add(1,2)==3",
    );
    assert!(outcome.passed, "{}", outcome.logs);
    assert!(outcome.logs.starts_with("[duration_ms="));
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_failing_assertion_rejected() {
    if !pytest_available() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let outcome = runner(root.path(), 30).execute(
        "def add(a,b): return a-b",
        "def test_add(): assert add(1,2)==3",
    );
    assert!(!outcome.passed);
    assert!(matches!(outcome.cause, ExecCause::Failed { .. }));
    assert!(outcome.logs.contains("assert"), "{}", outcome.logs);
}

#[test]
fn test_infinite_loop_times_out() {
    if !pytest_available() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let started = Instant::now();
    let outcome = runner(root.path(), 2).execute(
        "def spin():\n    while True:\n        pass",
        "def test_spin(): spin()",
    );
    assert!(!outcome.passed);
    assert_eq!(outcome.cause, ExecCause::TimedOut);
    assert!(outcome.logs.contains("2s"), "{}", outcome.logs);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_smoke_test_for_code_without_tests() {
    if !pytest_available() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let runner = runner(root.path(), 30);
    let smoke = verifybox::split::splitter::SMOKE_TEST;

    assert!(runner.execute("def f():\n    return 1", smoke).passed);
    assert!(!runner.execute("_private = 1", smoke).passed);
    assert!(!runner.execute("def broken(:\n    pass", smoke).passed);
}

#[test]
fn test_pipeline_end_to_end() {
    if !pytest_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.jsonl");
    fs::write(
        &input,
        concat!(
            r#"{"id":1,"output":"def add(a,b): return a+b\ndef test_add(): assert add(1,2)==3"}"#,
            "\n",
            r#"{"id":2,"output":"import socket\ndef f(): pass"}"#,
            "\n",
            r#"{"id":3,"output":"def add(a,b): return a*b\ndef test_add(): assert add(1,2)==3"}"#,
            "\n",
        ),
    )
    .unwrap();

    let config = VerifyConfig {
        workspace_root: Some(dir.path().to_path_buf()),
        ..VerifyConfig::default()
    };
    let summary = Pipeline::from_config(&config)
        .unwrap()
        .process_file(&input, &output)
        .unwrap();

    assert_eq!(summary.seen, 3);
    assert_eq!(summary.kept, 1);
    assert_eq!(summary.rejected_unsafe, 1);
    assert_eq!(summary.rejected_fail, 1);

    let text = fs::read_to_string(&output).unwrap();
    let records: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], 1);
    assert_eq!(records[0]["verify_status"], "accepted");
    assert_eq!(records[0]["code"], "def add(a,b): return a+b");
}
