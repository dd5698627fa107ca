// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cancel;
pub mod command;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod request;
pub mod terminate;

pub use cancel::CancelToken;
pub use command::{ArgToken, CommandLine, LaunchMode};
pub use engine::{execute, execute_with_cancel, run_blocking};
pub use error::ExecError;
pub use outcome::ExecOutcome;
pub use request::{ExecRequest, clamp_timeout_secs};
pub use terminate::{ChildTerminator, PROCESS_GROUPS, Terminator, terminator_for};

#[cfg(unix)]
pub use terminate::GroupTerminator;
