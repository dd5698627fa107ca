// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the execution engine.
//!
//! Only problems detected before a child exists are errors. Everything that
//! happens to a running child (non-zero exit, timeout, kill) is reported in
//! [`ExecOutcome`](crate::ExecOutcome), and so is a failed spawn.

use thiserror::Error;

/// Errors that prevent an invocation from starting.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The request was rejected before any process was spawned.
    #[error("invalid exec request: {0}")]
    InvalidInput(String),

    /// The private runtime used by [`run_blocking`](crate::run_blocking) could
    /// not be built.
    #[error("failed to build tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
