/// Child process supervision
///
/// The test runner is spawned as the leader of its own process group with stdout
/// and stderr sharing one pipe. The supervisor polls against a wall-clock deadline,
/// escalates SIGTERM then SIGKILL to the whole group when the deadline passes or
/// shutdown is requested, sweeps the group after the leader exits and always reaps.
use crate::config::types::{OutputIntegrity, Result, VerifyError};
use crate::exec::signal;
use crate::utils::output::{OutputCollector, OutputLimits};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{pipe2, Pid};
use std::collections::BTreeMap;
use std::fs::File;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything needed to launch one supervised child
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
    /// Complete child environment; the parent environment is not inherited
    pub environment: BTreeMap<String, String>,
    pub wall_limit: Duration,
    /// Delay between group SIGTERM and group SIGKILL
    pub kill_grace: Duration,
    pub output: OutputLimits,
    /// Caller-owned cancellation flag, checked alongside the process-wide shutdown flag
    pub cancel: Option<Arc<AtomicBool>>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>, workdir: impl Into<PathBuf>) -> Self {
        LaunchSpec {
            program: program.into(),
            args,
            workdir: workdir.into(),
            environment: BTreeMap::new(),
            wall_limit: Duration::from_secs(10),
            kill_grace: Duration::from_millis(200),
            output: OutputLimits::default(),
            cancel: None,
        }
    }

    fn cancelled(&self) -> bool {
        signal::shutdown_requested()
            || self
                .cancel
                .as_ref()
                .map(|flag| flag.load(Ordering::SeqCst))
                .unwrap_or(false)
    }
}

/// What the supervisor did to bring the group down
#[derive(Clone, Debug, Default)]
pub struct KillReport {
    pub term_sent: bool,
    pub kill_sent: bool,
    pub waited_ms: u64,
    pub notes: Vec<String>,
}

/// Why supervision ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Leader exited on its own
    Exited,
    /// Wall-clock deadline passed
    WallTimeout,
    /// Shutdown or caller cancellation
    Interrupted,
}

#[derive(Clone, Debug)]
pub struct LaunchOutcome {
    pub pid: i32,
    pub exit_code: Option<i32>,
    pub term_signal: Option<i32>,
    pub termination: Termination,
    pub wall_time: Duration,
    /// Combined stdout and stderr (tail)
    pub output: String,
    pub output_integrity: OutputIntegrity,
    pub kill_report: Option<KillReport>,
}

impl LaunchOutcome {
    pub fn success(&self) -> bool {
        self.termination == Termination::Exited && self.exit_code == Some(0)
    }

    pub fn timed_out(&self) -> bool {
        self.termination == Termination::WallTimeout
    }
}

fn to_process_error(prefix: &str, err: impl std::fmt::Display) -> VerifyError {
    VerifyError::Process(format!("{}: {}", prefix, err))
}

/// Spawn, supervise and reap one child. Errors only when the child cannot be started.
pub fn launch(spec: &LaunchSpec) -> Result<LaunchOutcome> {
    let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC)?;
    let stderr_end = write_end
        .try_clone()
        .map_err(|e| to_process_error("dup output pipe", e))?;

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.workdir)
        .env_clear()
        .envs(&spec.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::from(write_end))
        .stderr(Stdio::from(stderr_end))
        .process_group(0);

    let started = Instant::now();
    let spawned = cmd.spawn();
    // Drop our copies of the write end so the reader sees EOF once the group is gone.
    drop(cmd);
    let mut child = spawned.map_err(|e| to_process_error(&format!("spawn {}", spec.program), e))?;

    let pid = child.id() as i32;
    let pgid = Pid::from_raw(pid);
    let collector = OutputCollector::spawn(File::from(read_end), spec.output.clone());

    log::debug!("Spawned {} (pid {}) in {}", spec.program, pid, spec.workdir.display());

    let mut termination = Termination::Exited;
    let mut kill_report = None;

    let status: Option<ExitStatus> = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if started.elapsed() >= spec.wall_limit {
                    termination = Termination::WallTimeout;
                } else if spec.cancelled() {
                    termination = Termination::Interrupted;
                } else {
                    thread::sleep(POLL_INTERVAL);
                    continue;
                }
                log::debug!("Terminating process group {} ({:?})", pid, termination);
                kill_report = Some(terminate_group(&mut child, pgid, spec.kill_grace));
                break child.wait().ok();
            }
            Err(e) => {
                let _ = terminate_group(&mut child, pgid, spec.kill_grace);
                let _ = child.wait();
                return Err(to_process_error("wait", e));
            }
        }
    };
    let wall_time = started.elapsed();

    // Stragglers that escaped the leader would keep the pipe open.
    sweep_group(pgid);

    let output = collector.finish();

    Ok(LaunchOutcome {
        pid,
        exit_code: status.and_then(|s| s.code()),
        term_signal: status.and_then(|s| s.signal()),
        termination,
        wall_time,
        output: output.text,
        output_integrity: output.integrity,
        kill_report,
    })
}

/// SIGTERM the group, give it `grace` to exit, then SIGKILL the group
pub fn terminate_group(child: &mut Child, pgid: Pid, grace: Duration) -> KillReport {
    let mut report = KillReport::default();
    let start = Instant::now();

    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => report.term_sent = true,
        Err(e) => {
            let _ = child.kill();
            report.term_sent = true;
            report.notes.push(format!("group SIGTERM failed, leader killed directly: {}", e));
        }
    }

    while start.elapsed() < grace {
        if matches!(child.try_wait(), Ok(Some(_))) {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) => report.kill_sent = true,
        Err(Errno::ESRCH) => report.notes.push("group already gone before SIGKILL".to_string()),
        Err(e) => {
            let _ = child.kill();
            report.kill_sent = true;
            report.notes.push(format!("group SIGKILL failed, leader killed directly: {}", e));
        }
    }

    report.waited_ms = start.elapsed().as_millis() as u64;
    report
}

fn sweep_group(pgid: Pid) {
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) => log::debug!("Swept leftover members of process group {}", pgid),
        Err(Errno::ESRCH) => {}
        Err(e) => log::warn!("Failed to sweep process group {}: {}", pgid, e),
    }
}
