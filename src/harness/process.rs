//! Subprocess execution with captured output and an optional wall-clock limit.
//!
//! Both the compiler driver and the runtime invoker spawn external programs; this module is the one place that
//! waits on them. stdout and stderr are drained on helper threads so a chatty child never blocks on a full pipe
//! while we poll for its exit. Once a timed-out child is killed, its output is collected only for a short grace
//! period: a grandchild that inherited the pipes may keep them open long after the child itself is gone.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use wasmval_core::ExecutionResult;

/// How often a running child is polled when a timeout is in effect.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long output is still collected after the limit has passed.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Read size for the drain threads.
const CHUNK_SIZE: usize = 8192;

/// Spawn `command`, wait for it (killing it once `timeout` elapses), and capture everything it printed.
///
/// Returns `Err` only when the process could not be spawned or waited on.
pub fn run_captured(mut command: Command, timeout: Option<Duration>) -> io::Result<ExecutionResult> {
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let started = Instant::now();
    let mut child = command.spawn()?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let (status, timed_out) = wait_for_child(&mut child, timeout, started)?;
    let duration = started.elapsed();

    let deadline = timeout.map(|limit| (started + limit).max(Instant::now()) + DRAIN_GRACE);
    Ok(ExecutionResult {
        exit_code: status.code(),
        stdout: collect(stdout, deadline),
        stderr: collect(stderr, deadline),
        timed_out,
        duration,
    })
}

/// Forward everything `reader` yields as chunks until end of stream or until nobody listens.
fn drain<R: Read + Send + 'static>(mut reader: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
    rx
}

/// Gather chunks until the stream closes, or until `deadline` when one is given.
fn collect(chunks: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> Vec<u8> {
    let mut out = Vec::new();
    let Some(chunks) = chunks else {
        return out;
    };
    loop {
        let next = match deadline {
            Some(deadline) => chunks.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => chunks.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(chunk) => out.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Timeout) => {
                tracing::debug!("output pipe still open after the child exited, truncating");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    out
}

fn wait_for_child(child: &mut Child, timeout: Option<Duration>, started: Instant) -> io::Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait()?, false));
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if started.elapsed() >= timeout {
            // The child may exit on its own between try_wait and kill; wait() reaps it either way.
            let _ = child.kill();
            return Ok((child.wait()?, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
