// SPDX-License-Identifier: MIT OR Apache-2.0
//! Invocation requests.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::terminate::PROCESS_GROUPS;
use crate::{ArgToken, CommandLine, ExecError};

/// Everything needed to run one child process.
///
/// Built once by the caller and consumed by [`execute`](crate::execute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// The command to launch.
    pub command: CommandLine,
    /// Wall-clock limit for the wait phase. `None` waits indefinitely and
    /// `Duration::ZERO` kills the child as soon as it is spawned.
    pub timeout: Option<Duration>,
    /// Variables layered over the caller's environment. `None` inherits the
    /// caller's environment unchanged.
    pub env: Option<BTreeMap<String, ArgToken>>,
}

impl ExecRequest {
    /// Create a request with no timeout and an inherited environment.
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            timeout: None,
            env: None,
        }
    }

    /// Run `args` directly; the first token is the program.
    pub fn exec<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ArgToken>,
    {
        Self::new(CommandLine::Exec(args.into_iter().map(Into::into).collect()))
    }

    /// Run `script` through the platform shell.
    pub fn shell(script: impl Into<ArgToken>) -> Self {
        Self::new(CommandLine::Shell(script.into()))
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the timeout from fractional seconds. See [`clamp_timeout_secs`].
    pub fn timeout_secs(self, secs: f64) -> Self {
        self.with_timeout(clamp_timeout_secs(secs))
    }

    /// Add or override one environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<ArgToken>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Add or override several environment variables.
    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ArgToken>,
    {
        let env = self.env.get_or_insert_with(BTreeMap::new);
        for (k, v) in vars {
            env.insert(k.into(), v.into());
        }
        self
    }

    /// Returns `true` if bytes appear in the command or any env value.
    pub fn has_bytes(&self) -> bool {
        self.command.has_bytes()
            || self
                .env
                .as_ref()
                .is_some_and(|env| env.values().any(ArgToken::is_bytes))
    }

    /// Reject requests this host cannot run.
    pub fn validate(&self) -> Result<(), ExecError> {
        self.validate_for(PROCESS_GROUPS)
    }

    pub(crate) fn validate_for(&self, process_groups: bool) -> Result<(), ExecError> {
        if !process_groups && self.has_bytes() {
            return Err(ExecError::InvalidInput(
                "byte-valued arguments or environment values require a host with process-group support"
                    .into(),
            ));
        }
        Ok(())
    }
}

/// Convert fractional seconds to a timeout.
///
/// Zero, negative and NaN inputs become `Duration::ZERO`, which expires
/// immediately. Values too large for a `Duration` saturate to `Duration::MAX`.
pub fn clamp_timeout_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exec_builder_collects_tokens() {
        let req = ExecRequest::exec(["echo", "hi"]);
        assert_eq!(
            req.command,
            CommandLine::Exec(vec!["echo".into(), "hi".into()])
        );
        assert!(req.timeout.is_none());
        assert!(req.env.is_none());
    }

    #[test]
    fn env_builders_accumulate_and_override() {
        let req = ExecRequest::shell("env")
            .with_env("A", "1")
            .with_envs([("B", "2"), ("A", "3")]);
        let env = req.env.unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env["A"], ArgToken::from("3"));
    }

    #[test]
    fn bytes_rejected_without_process_groups() {
        let req = ExecRequest::exec([ArgToken::from("echo"), ArgToken::from(b"x".as_slice())]);
        assert!(matches!(
            req.validate_for(false),
            Err(ExecError::InvalidInput(_))
        ));
        assert!(req.validate_for(true).is_ok());
    }

    #[test]
    fn shell_bytes_and_env_bytes_are_checked() {
        let shell = ExecRequest::shell(b"echo hi".to_vec());
        assert!(shell.validate_for(false).is_err());

        let env = ExecRequest::shell("echo $X").with_env("X", b"\xff".to_vec());
        assert!(env.validate_for(false).is_err());

        let text = ExecRequest::shell("echo $X").with_env("X", "y");
        assert!(text.validate_for(false).is_ok());
    }

    #[test]
    fn non_positive_timeouts_expire_immediately() {
        assert_eq!(clamp_timeout_secs(0.0), Duration::ZERO);
        assert_eq!(clamp_timeout_secs(-3.5), Duration::ZERO);
        assert_eq!(clamp_timeout_secs(f64::NAN), Duration::ZERO);
        assert_eq!(clamp_timeout_secs(f64::INFINITY), Duration::MAX);
        assert_eq!(clamp_timeout_secs(0.25), Duration::from_millis(250));
    }

    proptest! {
        #[test]
        fn clamped_timeout_is_monotonic(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(clamp_timeout_secs(lo) <= clamp_timeout_secs(hi));
        }

        #[test]
        fn positive_timeout_round_trips(ms in 1u64..10_000_000) {
            let secs = ms as f64 / 1000.0;
            let d = clamp_timeout_secs(secs);
            prop_assert!((d.as_secs_f64() - secs).abs() < 1e-6);
        }
    }
}
