//! Low-level external program invocation with timeout enforcement.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use wait_timeout::ChildExt;

/// Timeout for collecting output from child process pipes after exit.
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum captured output per stream (10MB).
const MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

/// Restores the process working directory when dropped.
///
/// External programs are invoked from their own directory so they can find
/// their auxiliary files; the switch is undone on every exit path, including
/// early returns and panics. The cwd is process-global state, so the scope
/// of a guard is a critical section: nothing else may run external work
/// concurrently.
pub struct CwdGuard {
    original: PathBuf,
}

impl CwdGuard {
    pub fn change_to(dir: &Path) -> Result<Self> {
        let original =
            std::env::current_dir().context("failed to read current working directory")?;
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
        Ok(Self { original })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        // Best effort; nothing sensible to do with a failure during unwind.
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Result of one external invocation.
#[derive(Debug)]
pub enum ExecOutcome {
    /// The program exited on its own within the timeout.
    Completed {
        success: bool,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The program exceeded the timeout and was killed. Captured output up
    /// to the kill is preserved for diagnostics.
    TimedOut {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
}

/// Run an external program with a bounded wait.
///
/// The working directory is switched to the program's own directory for the
/// duration of the call. With `capture` set, stdout/stderr are drained into
/// strings; otherwise all three stdio streams are inherited so the program
/// can interact with the user directly.
pub fn run_program(
    program: &Path,
    args: &[String],
    timeout: Duration,
    capture: bool,
) -> Result<ExecOutcome> {
    // Resolve before the cwd switch so a relative program path still works.
    let program = fs::canonicalize(program)
        .with_context(|| format!("failed to resolve program path: {}", program.display()))?;

    let _guard = match program.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Some(CwdGuard::change_to(dir)?),
        _ => None,
    };

    let mut cmd = Command::new(&program);
    cmd.args(args);
    if capture {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
    } else {
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn program: {}", program.display()))?;

    // Start draining output BEFORE waiting for exit. Waiting first can
    // deadlock: the child blocks on write() once the pipe buffer (~64KB)
    // fills up.
    let (stdout_tx, stdout_rx) = mpsc::channel();
    let (stderr_tx, stderr_rx) = mpsc::channel();

    if let Some(stdout) = child.stdout.take() {
        thread::spawn(move || {
            let _ = stdout_tx.send(read_stream_to_string(stdout));
        });
    } else {
        let _ = stdout_tx.send(String::new());
    }

    if let Some(stderr) = child.stderr.take() {
        thread::spawn(move || {
            let _ = stderr_tx.send(read_stream_to_string(stderr));
        });
    } else {
        let _ = stderr_tx.send(String::new());
    }

    let wait_result = child
        .wait_timeout(timeout)
        .with_context(|| format!("failed to wait for program: {}", program.display()))?;

    match wait_result {
        Some(status) => {
            let stdout = collect_output(&stdout_rx);
            let stderr = collect_output(&stderr_rx);
            Ok(ExecOutcome::Completed {
                success: status.success(),
                exit_code: status.code(),
                stdout,
                stderr,
            })
        }
        None => {
            kill_child_process(&mut child);
            // Killing closes the pipes, so the reader threads finish shortly.
            let stdout = collect_output(&stdout_rx);
            let stderr = collect_output(&stderr_rx);
            Ok(ExecOutcome::TimedOut {
                timeout,
                stdout,
                stderr,
            })
        }
    }
}

fn collect_output(rx: &mpsc::Receiver<String>) -> String {
    rx.recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
        .unwrap_or_else(|_| "[output collection timed out]".to_string())
}

/// Read a stream to string with a size cap, draining past the cap so the
/// child never sees a broken pipe.
fn read_stream_to_string<R: Read>(mut stream: R) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let remaining = MAX_OUTPUT_SIZE.saturating_sub(buf.len());
                let to_copy = n.min(remaining);
                buf.extend_from_slice(&chunk[..to_copy]);
                if to_copy < n {
                    let mut discard = [0u8; 8192];
                    while stream.read(&mut discard).unwrap_or(0) > 0 {}
                    buf.extend_from_slice(b"\n[output truncated at 10MB]");
                    break;
                }
            }
            Err(_) => {
                if buf.is_empty() {
                    return "[error reading output]".to_string();
                }
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}

fn kill_child_process(child: &mut Child) {
    // The process may already have exited; reap either way.
    let _ = child.kill();
    let _ = child.wait();
}
