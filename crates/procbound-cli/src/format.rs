// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output formatting for the procbound CLI.

use procbound_core::ExecOutcome;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// JSON view of an [`ExecOutcome`] printed by `run --json`.
///
/// Captured streams are decoded lossily as UTF-8.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    /// Exit code, or `-N` for a signal.
    pub return_code: Option<i32>,
    /// Captured stdout.
    pub stdout: Option<String>,
    /// Captured stderr.
    pub stderr: Option<String>,
    /// Wait-phase duration in seconds.
    pub elapsed_secs: Option<f64>,
    /// Whether the child was killed on timeout or cancellation.
    pub killed: bool,
    /// Why the child could not be started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_error: Option<String>,
}

impl From<&ExecOutcome> for Report {
    fn from(outcome: &ExecOutcome) -> Self {
        let lossy = |b: &Vec<u8>| String::from_utf8_lossy(b).into_owned();
        Self {
            return_code: outcome.return_code,
            stdout: outcome.stdout.as_ref().map(lossy),
            stderr: outcome.stderr.as_ref().map(lossy),
            elapsed_secs: outcome.elapsed.map(|d| d.as_secs_f64()),
            killed: outcome.killed,
            spawn_error: outcome.spawn_error.clone(),
        }
    }
}

/// Serialize `outcome` as a single JSON line.
pub fn to_json(outcome: &ExecOutcome) -> serde_json::Result<String> {
    serde_json::to_string(&Report::from(outcome))
}

/// Replay the child's streams onto our own stdout and stderr.
///
/// Bytes are written untouched. A spawn failure is reported on stderr.
pub fn write_passthrough(
    outcome: &ExecOutcome,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    if let Some(reason) = &outcome.spawn_error {
        writeln!(err, "procbound: {reason}")?;
        return Ok(());
    }
    if let Some(bytes) = &outcome.stdout {
        out.write_all(bytes)?;
    }
    if let Some(bytes) = &outcome.stderr {
        err.write_all(bytes)?;
    }
    if outcome.killed {
        let secs = outcome.elapsed.map(|d| d.as_secs_f64()).unwrap_or_default();
        writeln!(err, "procbound: killed after {secs:.3}s")?;
    }
    out.flush()?;
    err.flush()
}
