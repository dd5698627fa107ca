// SPDX-License-Identifier: MIT OR Apache-2.0
//! Termination strategies for the kill phase.
//!
//! The engine picks a [`Terminator`] at spawn time and calls it without
//! knowing which variant it holds. Both variants send an immediate, forceful
//! kill; neither waits for a graceful shutdown.

use std::fmt;
use std::io;
use tokio::process::Child;
use tracing::{debug, warn};

use crate::LaunchMode;

/// Whether this host can signal whole process groups.
pub const PROCESS_GROUPS: bool = cfg!(unix);

/// A way of forcefully terminating a spawned child.
pub trait Terminator: Send + Sync + fmt::Debug {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Send the kill. A child that already exited counts as success.
    fn terminate(&self, child: &mut Child) -> io::Result<()>;
}

/// Kills only the tracked child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChildTerminator;

impl Terminator for ChildTerminator {
    fn name(&self) -> &'static str {
        "child"
    }

    fn terminate(&self, child: &mut Child) -> io::Result<()> {
        match child.start_kill() {
            Ok(()) => Ok(()),
            // Already reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                debug!(target: "procbound.exec", "child already exited before kill");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Kills every process in the child's process group.
///
/// The child must have been spawned as a group leader, so its pid is also
/// the group id.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct GroupTerminator {
    pgid: i32,
}

#[cfg(unix)]
impl GroupTerminator {
    /// Terminator for the group led by `pgid`.
    pub fn new(pgid: i32) -> Self {
        Self { pgid }
    }
}

#[cfg(unix)]
impl Terminator for GroupTerminator {
    fn name(&self) -> &'static str {
        "process-group"
    }

    fn terminate(&self, child: &mut Child) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(self.pgid), Signal::SIGKILL) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => {
                debug!(target: "procbound.exec", pgid = self.pgid, "process group already gone");
                Ok(())
            }
            Err(errno) => {
                warn!(
                    target: "procbound.exec",
                    pgid = self.pgid,
                    error = %errno,
                    "killpg failed, killing child directly"
                );
                ChildTerminator.terminate(child)
            }
        }
    }
}

/// Pick the terminator for a freshly spawned child.
///
/// Shell launches on hosts with process groups get a group terminator; every
/// other case kills the single child.
pub fn terminator_for(mode: LaunchMode, pid: Option<u32>) -> Box<dyn Terminator> {
    #[cfg(unix)]
    {
        if mode == LaunchMode::Shell {
            if let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()) {
                return Box::new(GroupTerminator::new(pgid));
            }
        }
    }
    #[cfg(not(unix))]
    let _ = (mode, pid);
    Box::new(ChildTerminator)
}
