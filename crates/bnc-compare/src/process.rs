//! Child processes with a wall-clock deadline.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::{CompareError, Result};

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Error describing a non-zero exit, with the child's stderr.
    pub fn failure(&self, tool: &str) -> CompareError {
        let stderr = self.stderr.trim();
        let message = if stderr.is_empty() {
            format!("exited with {}", self.status)
        } else {
            format!("exited with {}: {}", self.status, stderr)
        };
        CompareError::tool_failure(tool, message)
    }
}

/// Run `command` to completion, feeding `input` on stdin.
///
/// Output pipes are drained on helper threads so a chatty child cannot block
/// on a full pipe while we wait. On unix the child leads a new process group;
/// when `deadline` elapses the whole group is killed, so processes the child
/// started die with it, and [`CompareError::Timeout`] is returned.
pub fn run_with_deadline(
    mut command: Command,
    input: Option<Vec<u8>>,
    deadline: Option<Duration>,
    tool: &str,
) -> Result<ProcessOutput> {
    command
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    debug!("Spawning {tool}: {command:?}");
    let mut child = command
        .spawn()
        .map_err(|e| CompareError::tool_failure(tool, format!("could not start: {e}")))?;

    let writer = match (input, child.stdin.take()) {
        (Some(bytes), Some(mut stdin)) => Some(thread::spawn(move || {
            // A child that exits without reading closes the pipe; that is
            // reported through its exit status instead.
            let _ = stdin.write_all(&bytes);
        })),
        _ => None,
    };
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match deadline {
        Some(limit) => match child.wait_timeout(limit)? {
            Some(status) => status,
            None => {
                warn!("{tool} exceeded {limit:?}, killing it");
                kill_group(&mut child);
                return Err(CompareError::Timeout {
                    tool: tool.to_string(),
                    after: limit,
                });
            }
        },
        None => child.wait()?,
    };

    if let Some(handle) = writer {
        let _ = handle.join();
    }
    Ok(ProcessOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: signals the group created at spawn, led by our own child
            // which has not been reaped yet, so the id cannot have been reused.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
