// SPDX-License-Identifier: MIT OR Apache-2.0
//! The record produced by every invocation.

use std::borrow::Cow;
use std::process::ExitStatus;
use std::time::Duration;

/// Result of one invocation.
///
/// A spawn failure sets only [`spawn_error`](Self::spawn_error). Every other
/// outcome sets `return_code`, `stdout`, `stderr` and `elapsed`; `killed`
/// tells apart a natural exit from a timeout or cancellation kill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Exit code, or `-N` for a child terminated by signal `N`.
    pub return_code: Option<i32>,
    /// Bytes the child wrote to stdout.
    pub stdout: Option<Vec<u8>>,
    /// Bytes the child wrote to stderr.
    pub stderr: Option<Vec<u8>>,
    /// Wall-clock duration of the wait phase.
    pub elapsed: Option<Duration>,
    /// Why the child could not be started.
    pub spawn_error: Option<String>,
    /// `true` if the engine killed the child on timeout or cancellation.
    pub killed: bool,
}

impl ExecOutcome {
    /// Outcome for a child that never started.
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self {
            spawn_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// `true` when the child ran to completion with exit code 0.
    pub fn is_success(&self) -> bool {
        !self.killed && self.return_code == Some(0)
    }

    /// Captured stdout decoded lossily as UTF-8.
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.stdout.as_deref().unwrap_or_default())
    }

    /// Captured stderr decoded lossily as UTF-8.
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.stderr.as_deref().unwrap_or_default())
    }
}

/// Map an exit status to a return code, reporting signals as `-signo`.
pub(crate) fn return_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signo) = status.signal() {
            return -signo;
        }
    }
    -1
}
