// SPDX-License-Identifier: MIT OR Apache-2.0
//! Library half of the `procbound` binary: argument handling, exit-status
//! mapping and output formatting.
#![deny(unsafe_code)]

pub mod commands;
pub mod format;
