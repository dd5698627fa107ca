// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line representation: argument tokens and launch modes.

use std::ffi::OsString;
use std::fmt;

use crate::ExecError;

/// A single argument token or environment value.
///
/// Byte tokens carry arbitrary (possibly non-UTF-8) data and are only
/// accepted on hosts that support process groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgToken {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl ArgToken {
    /// Returns `true` for the byte-valued variant.
    pub fn is_bytes(&self) -> bool {
        matches!(self, ArgToken::Bytes(_))
    }

    /// Convert to an OS string suitable for [`std::process::Command`].
    #[cfg(unix)]
    pub fn to_os_string(&self) -> Result<OsString, ExecError> {
        use std::os::unix::ffi::OsStringExt;
        Ok(match self {
            ArgToken::Text(s) => OsString::from(s),
            ArgToken::Bytes(b) => OsString::from_vec(b.clone()),
        })
    }

    /// Convert to an OS string suitable for [`std::process::Command`].
    #[cfg(not(unix))]
    pub fn to_os_string(&self) -> Result<OsString, ExecError> {
        match self {
            ArgToken::Text(s) => Ok(OsString::from(s)),
            ArgToken::Bytes(_) => Err(ExecError::InvalidInput(
                "byte-valued tokens are not supported on this host".into(),
            )),
        }
    }
}

impl fmt::Display for ArgToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgToken::Text(s) => f.write_str(s),
            ArgToken::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for ArgToken {
    fn from(s: &str) -> Self {
        ArgToken::Text(s.to_owned())
    }
}

impl From<String> for ArgToken {
    fn from(s: String) -> Self {
        ArgToken::Text(s)
    }
}

impl From<&String> for ArgToken {
    fn from(s: &String) -> Self {
        ArgToken::Text(s.clone())
    }
}

impl From<Vec<u8>> for ArgToken {
    fn from(b: Vec<u8>) -> Self {
        ArgToken::Bytes(b)
    }
}

impl From<&[u8]> for ArgToken {
    fn from(b: &[u8]) -> Self {
        ArgToken::Bytes(b.to_vec())
    }
}

/// How the child is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Direct `execve` of an argument vector, no shell.
    Exec,
    /// Interpreted by the platform shell, in its own process group.
    Shell,
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LaunchMode::Exec => "exec",
            LaunchMode::Shell => "shell",
        })
    }
}

/// The command to run: an argument vector or a shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Program followed by its arguments, executed without a shell.
    Exec(Vec<ArgToken>),
    /// A script handed to `/bin/sh -c` (or `cmd /C` off Unix).
    Shell(ArgToken),
}

impl CommandLine {
    /// Launch mode implied by the command's shape.
    pub fn mode(&self) -> LaunchMode {
        match self {
            CommandLine::Exec(_) => LaunchMode::Exec,
            CommandLine::Shell(_) => LaunchMode::Shell,
        }
    }

    /// Returns `true` if any token is byte-valued.
    pub fn has_bytes(&self) -> bool {
        match self {
            CommandLine::Exec(args) => args.iter().any(ArgToken::is_bytes),
            CommandLine::Shell(script) => script.is_bytes(),
        }
    }

    /// Program name used in log lines and spawn error messages.
    pub fn program(&self) -> String {
        match self {
            CommandLine::Exec(args) => args.first().map(ToString::to_string).unwrap_or_default(),
            CommandLine::Shell(_) => SHELL_PROGRAM.to_owned(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Exec(args) => {
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{arg}")?;
                }
                Ok(())
            }
            CommandLine::Shell(script) => write!(f, "{script}"),
        }
    }
}

#[cfg(unix)]
pub(crate) const SHELL_PROGRAM: &str = "/bin/sh";
#[cfg(unix)]
pub(crate) const SHELL_FLAG: &str = "-c";

#[cfg(not(unix))]
pub(crate) const SHELL_PROGRAM: &str = "cmd";
#[cfg(not(unix))]
pub(crate) const SHELL_FLAG: &str = "/C";
