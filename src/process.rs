use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::GateError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to keep collecting output after the child is gone but its pipes
/// are still open, e.g. held by a process that escaped the group kill.
const DRAIN_GRACE: Duration = Duration::from_millis(250);
const CHUNK: usize = 8 * 1024;

/// What one child process did. A nonzero exit is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` when the child was ended by a signal, including a deadline kill.
    pub exit_code: Option<i32>,
    /// Everything read before the pipe closed; partial when `timed_out`.
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut s = String::with_capacity(self.stdout.len() + self.stderr.len());
        s.push_str(&self.stdout);
        s.push_str(&self.stderr);
        s
    }
}

/// Spawn `command[0]` with the remaining elements as arguments and wait for it.
///
/// Only a failure to start or wait for the child is an error. On unix the
/// child leads its own process group. With a `deadline`, a child still running
/// when it expires is killed together with everything it started, and the
/// result is marked `timed_out` with whatever output was read so far.
pub fn invoke<S: AsRef<str>>(
    command: &[S],
    cwd: Option<&Path>,
    deadline: Option<Duration>,
) -> Result<ProcessResult, GateError> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| GateError::InvalidConfig("empty command line".to_string()))?;
    let program = program.as_ref();

    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(AsRef::as_ref));
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    tracing::debug!(program, args = ?args.iter().map(AsRef::as_ref).collect::<Vec<_>>(), "spawn");

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| GateError::Spawn {
        program: program.to_string(),
        source,
    })?;

    // Drain both pipes off-thread so a chatty child can not block on a full pipe.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let (status, timed_out) =
        wait(&mut child, started, deadline).map_err(|source| GateError::Wait {
            program: program.to_string(),
            source,
        })?;

    // Pipes stay open as long as anything in the group holds them. Past the
    // deadline, or after a kill, only a short grace is allowed.
    let drain_until = match deadline {
        _ if timed_out => Some(Instant::now() + DRAIN_GRACE),
        Some(limit) => Some((started + limit).max(Instant::now() + DRAIN_GRACE)),
        None => None,
    };
    let (stdout, out_closed) = collect(stdout, drain_until);
    let (stderr, err_closed) = collect(stderr, drain_until);

    if timed_out {
        tracing::warn!(program, ?deadline, "deadline expired, process group killed");
    } else {
        tracing::debug!(program, code = ?status.code(), "exit");
        if !(out_closed && err_closed) {
            tracing::warn!(program, "output pipes still held after exit, killing process group");
            kill_group(&mut child);
        }
    }

    Ok(ProcessResult {
        exit_code: if timed_out { None } else { status.code() },
        stdout,
        stderr,
        timed_out,
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0u8; CHUNK];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
    rx
}

/// Gather chunks until the pipe closes or `until` passes. The flag is `true`
/// when the pipe closed.
fn collect(rx: Option<Receiver<Vec<u8>>>, until: Option<Instant>) -> (String, bool) {
    let Some(rx) = rx else {
        return (String::new(), true);
    };
    let mut bytes = Vec::new();
    let closed = loop {
        let next = match until {
            Some(t) => rx.recv_timeout(t.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break true,
            Err(RecvTimeoutError::Timeout) => {
                bytes.extend(rx.try_iter().flatten());
                break false;
            }
        }
    };
    (String::from_utf8_lossy(&bytes).into_owned(), closed)
}

fn wait(
    child: &mut Child,
    started: Instant,
    deadline: Option<Duration>,
) -> std::io::Result<(ExitStatus, bool)> {
    let Some(limit) = deadline else {
        return Ok((child.wait()?, false));
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if started.elapsed() >= limit {
            kill_group(child);
            // The child may exit between try_wait and kill; either way reap it.
            return Ok((child.wait()?, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGKILL the child's whole process group, then the child itself.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: kill(2) with a negative pid only signals the group the
            // child leads; no memory is shared with the callee.
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}
