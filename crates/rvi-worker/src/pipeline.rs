//! Operation pipeline executor.
//!
//! Runs a run request's operations in order inside a sandbox root. The first
//! failing shell invocation stops the pipeline: later operations are reported
//! as skipped and never touch the sandbox.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use walkdir::WalkDir;

use rvi_protocol::ops::{OperationReport, OperationStatus};
use rvi_protocol::{Interpreter, Operation};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long output pipes may stay open once the shell itself is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Result of running a whole pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub succeeded: bool,
    /// Description of the failing operation, if any.
    pub diagnostics: Option<String>,
    /// One report per operation, in pipeline order.
    pub reports: Vec<OperationReport>,
}

/// Sequential executor bound to one sandbox root.
pub struct Pipeline {
    root: PathBuf,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            timeout,
        }
    }

    /// Execute `operations` in order, stopping at the first failure.
    pub fn execute(&self, operations: &[Operation]) -> PipelineOutcome {
        let mut reports = Vec::with_capacity(operations.len());
        let mut diagnostics: Option<String> = None;

        for (index, operation) in operations.iter().enumerate() {
            if diagnostics.is_some() {
                reports.push(OperationReport::skipped(index, operation.clone()));
                continue;
            }

            tracing::info!(index, operation = %operation, "running operation");
            let report = match operation {
                Operation::ShellInvocation {
                    interpreter,
                    command_line,
                } => self.run_shell(index, operation, *interpreter, command_line),
                Operation::EnvironmentReset => self.reset_environment(index, operation),
            };

            if report.status != OperationStatus::Succeeded {
                let message = describe_failure(&report, self.timeout);
                tracing::warn!(index, status = ?report.status, "{}", message);
                diagnostics = Some(message);
            }
            reports.push(report);
        }

        PipelineOutcome {
            succeeded: diagnostics.is_none(),
            diagnostics,
            reports,
        }
    }

    fn run_shell(
        &self,
        index: usize,
        operation: &Operation,
        interpreter: Interpreter,
        command_line: &str,
    ) -> OperationReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut report = OperationReport {
            index,
            operation: operation.clone(),
            status: OperationStatus::Failed,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            started_at: Some(started_at),
            duration_ms: 0,
        };

        let mut command = shell_command(interpreter, command_line);
        command
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate_process_group(&mut command);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                report.stderr = format!("failed to start shell: {}", e);
                report.duration_ms = elapsed_ms(start);
                return report;
            }
        };

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.wait_with_timeout(&mut child, start) {
            Ok(Some(status)) => {
                report.exit_code = status.code();
                if status.success() {
                    report.status = OperationStatus::Succeeded;
                }
                Some(status)
            }
            Ok(None) => {
                report.status = OperationStatus::TimedOut;
                None
            }
            Err(e) => {
                report.stderr = format!("failed to wait for shell: {}", e);
                None
            }
        };

        // Grandchildren that escaped the kill may hold the pipes open.
        let remaining = self.timeout.saturating_sub(start.elapsed());
        let drain_deadline = Instant::now() + remaining.max(DRAIN_GRACE);
        report.stdout = stdout.collect(drain_deadline);
        let captured = stderr.collect(drain_deadline);
        if report.stderr.is_empty() {
            report.stderr = captured;
        } else if !captured.is_empty() {
            report.stderr = format!("{}\n{}", captured, report.stderr);
        }
        report.duration_ms = elapsed_ms(start);

        tracing::debug!(
            index,
            exit_code = ?status.and_then(|s| s.code()),
            duration_ms = report.duration_ms,
            "operation finished"
        );
        report
    }

    /// Poll until the child exits or the timeout elapses. `Ok(None)` means
    /// the child was killed for running too long.
    fn wait_with_timeout(
        &self,
        child: &mut Child,
        start: Instant,
    ) -> std::io::Result<Option<std::process::ExitStatus>> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= self.timeout {
                kill_process_group(child);
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Give every file and directory in the sandbox mode 0755.
    ///
    /// Restored snapshots carry no permission bits, so scripts shipped in the
    /// snapshot are not executable until this runs. Never fails the pipeline.
    fn reset_environment(&self, index: usize, operation: &Operation) -> OperationReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut adjusted = 0usize;

        for entry in WalkDir::new(&self.root).follow_links(false) {
            match entry {
                Ok(entry) if !entry.path_is_symlink() => match set_baseline_mode(entry.path()) {
                    Ok(()) => adjusted += 1,
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), error = %e, "permission reset failed")
                    }
                },
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "permission reset walk failed"),
            }
        }
        tracing::debug!(adjusted, "environment reset");

        OperationReport {
            index,
            operation: operation.clone(),
            status: OperationStatus::Succeeded,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            started_at: Some(started_at),
            duration_ms: elapsed_ms(start),
        }
    }
}

fn shell_command(interpreter: Interpreter, command_line: &str) -> Command {
    match interpreter {
        Interpreter::Posix => posix_shell(command_line),
        Interpreter::Native => native_shell(command_line),
    }
}

fn posix_shell(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(windows)]
fn native_shell(command_line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(command_line);
    command
}

#[cfg(not(windows))]
fn native_shell(command_line: &str) -> Command {
    posix_shell(command_line)
}

/// Put the shell in a fresh process group so a timeout can take down
/// everything it started.
#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = signal::killpg(pgid, Signal::SIGKILL) {
        tracing::debug!(pgid = child.id(), error = %e, "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

#[cfg(unix)]
fn set_baseline_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_baseline_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Output of one child pipe, read on its own thread so a chatty process
/// cannot block on a full pipe while we poll for its exit.
struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Option<Receiver<()>>,
}

impl Drain {
    /// Wait until the pipe closes or `deadline` passes, then return whatever
    /// has been read so far.
    fn collect(self, deadline: Instant) -> String {
        if let Some(done) = self.done {
            let wait = deadline.saturating_duration_since(Instant::now());
            if done.recv_timeout(wait).is_err() {
                tracing::debug!("output pipe still open, keeping partial output");
            }
        }
        let bytes = match self.buffer.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let done = pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        let sink = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buffer) => buffer.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
            let _ = tx.send(());
        });
        rx
    });
    Drain { buffer, done }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn describe_failure(report: &OperationReport, timeout: Duration) -> String {
    let what = match report.operation.command_line() {
        Some(command_line) => format!("operation #{} `{}`", report.index, command_line),
        None => format!("operation #{} ({})", report.index, report.operation),
    };

    let mut message = match (report.status, report.exit_code) {
        (OperationStatus::TimedOut, _) => {
            format!("{} timed out after {}s", what, timeout.as_secs())
        }
        (_, Some(code)) => format!("{} exited with status {}", what, code),
        (_, None) => format!("{} did not complete", what),
    };

    let stderr = report.stderr.trim();
    if !stderr.is_empty() {
        message.push('\n');
        message.push_str(stderr);
    }
    message
}
