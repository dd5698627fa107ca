// SPDX-License-Identifier: MIT OR Apache-2.0
//! The execution engine: spawn, race exit against timeout and cancellation,
//! kill when needed, and collect output.

use std::ffi::OsString;
use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::command::{SHELL_FLAG, SHELL_PROGRAM};
use crate::outcome::return_code;
use crate::terminate::{Terminator, terminator_for};
use crate::{
    ArgToken, CancelToken, CommandLine, ExecError, ExecOutcome, ExecRequest, LaunchMode,
};

const TARGET: &str = "procbound.exec";

/// Run `request` to completion or until its timeout expires.
///
/// Returns `Err` only for requests rejected before spawning. Spawn failures,
/// non-zero exits and timeouts all come back as an [`ExecOutcome`].
///
/// Dropping the returned future before it resolves kills the child (and its
/// process group for shell launches); no outcome is produced in that case.
pub async fn execute(request: ExecRequest) -> Result<ExecOutcome, ExecError> {
    execute_with_cancel(request, &CancelToken::new()).await
}

/// Like [`execute`], but also takes the kill path when `cancel` fires.
///
/// A cancelled run produces the same outcome shape as a timeout:
/// `killed == true` with whatever output the child wrote before it died.
pub async fn execute_with_cancel(
    request: ExecRequest,
    cancel: &CancelToken,
) -> Result<ExecOutcome, ExecError> {
    request.validate()?;

    let mut cmd = match build_command(&request) {
        Ok(cmd) => cmd,
        Err(reason) => return Ok(ExecOutcome::spawn_failed(reason)),
    };

    let mode = request.command.mode();
    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!(target: TARGET, %mode, error = %e, "spawn failed");
            return Ok(ExecOutcome::spawn_failed(format!(
                "{}: {e}",
                request.command.program()
            )));
        }
    };

    let mut child = Supervised::new(child, mode);
    debug!(
        target: TARGET,
        pid = ?child.pid,
        %mode,
        terminator = child.terminator.name(),
        "spawned child"
    );

    let stdout = drain(child.inner.stdout.take(), "stdout");
    let stderr = drain(child.inner.stderr.take(), "stderr");

    let start = Instant::now();
    let deadline = request.timeout.and_then(|t| start.checked_add(t));
    let expired_on_arrival = request.timeout.is_some_and(|t| t.is_zero());

    let exited = if expired_on_arrival || cancel.is_cancelled() {
        None
    } else {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            _ = deadline_elapsed(deadline) => None,
            status = child.wait() => Some(status),
        }
    };

    let outcome = match exited {
        Some(status) => {
            let elapsed = start.elapsed();
            let code = status_code(status);
            debug!(target: TARGET, pid = ?child.pid, code, ?elapsed, "child exited");
            ExecOutcome {
                return_code: Some(code),
                stdout: Some(collect(stdout, "stdout").await),
                stderr: Some(collect(stderr, "stderr").await),
                elapsed: Some(elapsed),
                spawn_error: None,
                killed: false,
            }
        }
        None => {
            let reason = if cancel.is_cancelled() {
                "cancelled"
            } else {
                "timeout"
            };
            warn!(
                target: TARGET,
                pid = ?child.pid,
                reason,
                terminator = child.terminator.name(),
                "killing child"
            );
            child.terminate();
            let code = status_code(child.wait().await);
            let stdout = collect(stdout, "stdout").await;
            let stderr = collect(stderr, "stderr").await;
            let elapsed = start.elapsed();
            debug!(target: TARGET, pid = ?child.pid, code, ?elapsed, "killed child reaped");
            ExecOutcome {
                return_code: Some(code),
                stdout: Some(stdout),
                stderr: Some(stderr),
                elapsed: Some(elapsed),
                spawn_error: None,
                killed: true,
            }
        }
    };

    child.settle();
    Ok(outcome)
}

/// Synchronous wrapper around [`execute`].
///
/// Drives the invocation on a private current-thread runtime.
///
/// # Errors
///
/// Returns [`ExecError::InvalidInput`] when called from inside a tokio
/// runtime (use [`execute`] there), and [`ExecError::Runtime`] if the private
/// runtime cannot be built.
pub fn run_blocking(request: ExecRequest) -> Result<ExecOutcome, ExecError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(ExecError::InvalidInput(
            "run_blocking called from inside an async runtime; use execute".into(),
        ));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ExecError::Runtime)?;
    runtime.block_on(execute(request))
}

fn build_command(request: &ExecRequest) -> Result<Command, String> {
    let mut cmd = match &request.command {
        CommandLine::Exec(args) => {
            let (program, rest) = args
                .split_first()
                .ok_or_else(|| "empty argument vector".to_string())?;
            let mut cmd = Command::new(os(program)?);
            for arg in rest {
                cmd.arg(os(arg)?);
            }
            cmd
        }
        CommandLine::Shell(script) => {
            let mut cmd = Command::new(SHELL_PROGRAM);
            cmd.arg(SHELL_FLAG).arg(os(script)?);
            #[cfg(unix)]
            cmd.process_group(0);
            cmd
        }
    };

    if let Some(env) = &request.env {
        for (key, value) in env {
            cmd.env(key, os(value)?);
        }
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    Ok(cmd)
}

fn os(token: &ArgToken) -> Result<OsString, String> {
    token.to_os_string().map_err(|e| e.to_string())
}

fn status_code(status: io::Result<ExitStatus>) -> i32 {
    match status {
        Ok(status) => return_code(status),
        Err(e) => {
            warn!(target: TARGET, error = %e, "failed to wait for child");
            -1
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Read a pipe to EOF on its own task so a child blocked on a full pipe
/// buffer never stalls the wait.
fn drain<R>(pipe: Option<R>, stream: &'static str) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf).await {
                debug!(target: TARGET, stream, error = %e, "pipe read ended early");
            }
        }
        buf
    })
}

async fn collect(task: JoinHandle<Vec<u8>>, stream: &'static str) -> Vec<u8> {
    match task.await {
        Ok(buf) => {
            debug!(target: TARGET, stream, bytes = buf.len(), "drained");
            buf
        }
        Err(e) => {
            warn!(target: TARGET, stream, error = %e, "drain task failed");
            Vec::new()
        }
    }
}

/// A spawned child plus the terminator chosen for it.
///
/// Dropping this before [`settle`](Self::settle) kills the child, so an
/// abandoned `execute` future never leaks a process. For shell launches the
/// guard stays armed through the final drain, which also covers background
/// descendants still holding the pipes after the shell itself exited.
struct Supervised {
    inner: Child,
    pid: Option<u32>,
    terminator: Box<dyn Terminator>,
    settled: bool,
}

impl Supervised {
    fn new(inner: Child, mode: LaunchMode) -> Self {
        let pid = inner.id();
        Self {
            inner,
            pid,
            terminator: terminator_for(mode, pid),
            settled: false,
        }
    }

    async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.inner.wait().await
    }

    fn terminate(&mut self) {
        if let Err(e) = self.terminator.terminate(&mut self.inner) {
            warn!(target: TARGET, pid = ?self.pid, error = %e, "kill failed");
        }
    }

    /// Disarm the drop guard once the outcome is complete.
    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for Supervised {
    fn drop(&mut self) {
        if !self.settled {
            debug!(target: TARGET, pid = ?self.pid, "invocation abandoned, killing child");
            let _ = self.terminator.terminate(&mut self.inner);
        }
    }
}
