// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations for the procbound CLI.
//!
//! These functions are library-level so they can be tested without
//! spawning the binary.

use anyhow::{Context, Result, bail};
use procbound_config::{ConfigWarning, ProcboundConfig, load_config, validate_config};
use procbound_core::{ExecOutcome, ExecRequest};
use schemars::schema_for;
use std::collections::BTreeMap;
use std::path::Path;

/// Exit status when the child was killed on timeout or cancellation.
pub const EXIT_KILLED: u8 = 124;

/// Exit status when the child could not be started.
pub const EXIT_SPAWN_FAILED: u8 = 127;

/// Exit status for invalid arguments or configuration.
pub const EXIT_USAGE: u8 = 2;

/// Arguments of the `run` subcommand, independent of clap.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Command words.
    pub command: Vec<String>,
    /// Timeout in seconds.
    pub timeout: Option<f64>,
    /// `KEY=VALUE` pairs.
    pub env_vars: Vec<String>,
    /// Force shell mode.
    pub shell: bool,
    /// Force exec mode.
    pub exec: bool,
}

/// Load the config file (or defaults) and validate it.
pub fn load_checked(path: Option<&Path>) -> Result<(ProcboundConfig, Vec<ConfigWarning>)> {
    let config = load_config(path).context("load config")?;
    let warnings = validate_config(&config).context("validate config")?;
    Ok((config, warnings))
}

/// Parse repeated `KEY=VALUE` arguments. Later keys win.
pub fn parse_env_vars(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid --env value '{pair}': expected KEY=VALUE");
        };
        if key.is_empty() {
            bail!("invalid --env value '{pair}': empty key");
        }
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}

/// Combine CLI arguments with config defaults into an engine request.
///
/// CLI flags win over config values; `--env` entries are layered over the
/// config's env table.
pub fn build_request(args: &RunArgs, config: &ProcboundConfig) -> Result<ExecRequest> {
    if args.command.is_empty() {
        bail!("no command given");
    }
    let shell = if args.exec {
        false
    } else {
        args.shell || config.shell.unwrap_or(false)
    };

    let mut request = if shell {
        ExecRequest::shell(args.command.join(" "))
    } else {
        ExecRequest::exec(args.command.iter())
    };

    if let Some(secs) = args.timeout.or(config.default_timeout_secs) {
        request = request.timeout_secs(secs);
    }

    let mut env = config.env.clone();
    env.extend(parse_env_vars(&args.env_vars)?);
    if !env.is_empty() {
        request = request.with_envs(env);
    }
    Ok(request)
}

/// Map an outcome to the CLI's exit status.
///
/// Killed children map to [`EXIT_KILLED`], spawn failures to
/// [`EXIT_SPAWN_FAILED`], signals to `128 + N`, and exit codes to
/// themselves (truncated to a byte).
pub fn exit_status(outcome: &ExecOutcome) -> u8 {
    if outcome.spawn_error.is_some() {
        return EXIT_SPAWN_FAILED;
    }
    if outcome.killed {
        return EXIT_KILLED;
    }
    match outcome.return_code {
        Some(code) if code >= 0 => (code & 0xff) as u8,
        Some(code) => 128u8.saturating_add(u8::try_from(-code).unwrap_or(u8::MAX)),
        None => 1,
    }
}

/// Pretty JSON schema for the config file.
pub fn schema_json() -> Result<String> {
    let value = serde_json::to_value(schema_for!(ProcboundConfig))?;
    serde_json::to_string_pretty(&value).context("serialize schema")
}
