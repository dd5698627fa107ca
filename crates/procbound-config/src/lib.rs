// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for procbound.
//!
//! [`ProcboundConfig`] holds the defaults the CLI applies to every
//! invocation. It is loaded from TOML, overridden from the environment, and
//! checked with [`validate_config`], which separates hard errors from
//! advisory [`ConfigWarning`]s.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file could not be read.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file (or an override variable) could not be parsed.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// The default timeout is unusually large.
    LargeTimeout {
        /// Timeout value in seconds.
        secs: f64,
    },
    /// The default timeout is zero, so every child is killed on spawn.
    ZeroTimeout,
    /// An environment overlay entry shadows a variable children rely on.
    ShadowedVariable {
        /// Variable name.
        key: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::LargeTimeout { secs } => {
                write!(f, "default timeout is large ({secs}s)")
            }
            ConfigWarning::ZeroTimeout => {
                f.write_str("default timeout is 0s; every command will be killed immediately")
            }
            ConfigWarning::ShadowedVariable { key } => {
                write!(f, "env overlay replaces '{key}' for every child")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Defaults applied by the `procbound` CLI.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ProcboundConfig {
    /// Timeout in seconds used when `--timeout` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_secs: Option<f64>,

    /// Log level (`"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Run commands through the shell unless `--exec` is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<bool>,

    /// Variables layered over the caller's environment for every child.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for ProcboundConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: None,
            log_level: Some("info".into()),
            shell: None,
            env: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Threshold above which a timeout generates a warning.
const LARGE_TIMEOUT_THRESHOLD: f64 = 3_600.0;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Variables whose replacement usually breaks children.
const SENSITIVE_VARIABLES: &[&str] = &["PATH", "HOME"];

/// Override for [`ProcboundConfig::log_level`].
pub const ENV_LOG_LEVEL: &str = "PROCBOUND_LOG_LEVEL";

/// Override for [`ProcboundConfig::default_timeout_secs`].
pub const ENV_TIMEOUT_SECS: &str = "PROCBOUND_TIMEOUT_SECS";

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`ProcboundConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`ProcboundConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<ProcboundConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => ProcboundConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Parse a TOML string into a [`ProcboundConfig`].
pub fn parse_toml(content: &str) -> Result<ProcboundConfig, ConfigError> {
    toml::from_str::<ProcboundConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply `PROCBOUND_LOG_LEVEL` and `PROCBOUND_TIMEOUT_SECS` from the process
/// environment.
pub fn apply_env_overrides(config: &mut ProcboundConfig) -> Result<(), ConfigError> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides using `lookup` in place of the process environment.
pub fn apply_overrides_from<F>(config: &mut ProcboundConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_LOG_LEVEL) {
        config.log_level = Some(val);
    }
    if let Some(val) = lookup(ENV_TIMEOUT_SECS) {
        let secs = val.trim().parse::<f64>().map_err(|e| ConfigError::ParseError {
            reason: format!("{ENV_TIMEOUT_SECS}={val:?}: {e}"),
        })?;
        config.default_timeout_secs = Some(secs);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (unknown log level, negative or non-finite timeout, malformed
/// env keys) are returned as a [`ConfigError::ValidationError`].
pub fn validate_config(config: &ProcboundConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(level) = &config.log_level {
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(format!("invalid log_level '{level}'"));
        }
    }

    if let Some(secs) = config.default_timeout_secs {
        if !secs.is_finite() || secs < 0.0 {
            errors.push(format!(
                "default_timeout_secs must be a finite, non-negative number (got {secs})"
            ));
        } else if secs == 0.0 {
            warnings.push(ConfigWarning::ZeroTimeout);
        } else if secs > LARGE_TIMEOUT_THRESHOLD {
            warnings.push(ConfigWarning::LargeTimeout { secs });
        }
    }

    for key in config.env.keys() {
        if key.is_empty() {
            errors.push("env key must not be empty".into());
        } else if key.contains('=') || key.contains('\0') {
            errors.push(format!("env key '{key}' must not contain '=' or NUL"));
        } else if SENSITIVE_VARIABLES.contains(&key.as_str()) {
            warnings.push(ConfigWarning::ShadowedVariable { key: key.clone() });
        }
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations. Values in `overlay` take precedence over `base`.
///
/// Env maps are combined; on key collisions the overlay entry wins.
pub fn merge_configs(base: ProcboundConfig, overlay: ProcboundConfig) -> ProcboundConfig {
    let mut env = base.env;
    env.extend(overlay.env);
    ProcboundConfig {
        default_timeout_secs: overlay.default_timeout_secs.or(base.default_timeout_secs),
        log_level: overlay.log_level.or(base.log_level),
        shell: overlay.shell.or(base.shell),
        env,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid_without_warnings() {
        let cfg = ProcboundConfig::default();
        let warnings = validate_config(&cfg).expect("default config should be valid");
        assert!(warnings.is_empty());
        assert_eq!(cfg.log_level.as_deref(), Some("info"));
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
            default_timeout_secs = 2.5
            log_level = "debug"
            shell = true

            [env]
            LC_ALL = "C"
        "#;
        let cfg = parse_toml(toml).unwrap();
        assert_eq!(cfg.default_timeout_secs, Some(2.5));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.shell, Some(true));
        assert_eq!(cfg.env["LC_ALL"], "C");
    }

    #[test]
    fn empty_toml_has_no_log_level() {
        let cfg = parse_toml("").unwrap();
        assert!(cfg.log_level.is_none());
        assert!(cfg.env.is_empty());
    }

    #[test]
    fn wrong_types_give_parse_error() {
        let err = parse_toml("default_timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = ProcboundConfig::default();
        apply_overrides_from(
            &mut cfg,
            lookup(&[(ENV_LOG_LEVEL, "warn"), (ENV_TIMEOUT_SECS, " 0.5 ")]),
        )
        .unwrap();
        assert_eq!(cfg.log_level.as_deref(), Some("warn"));
        assert_eq!(cfg.default_timeout_secs, Some(0.5));
    }

    #[test]
    fn unparsable_timeout_override_is_rejected() {
        let mut cfg = ProcboundConfig::default();
        let err = apply_overrides_from(&mut cfg, lookup(&[(ENV_TIMEOUT_SECS, "later")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }

    #[test]
    fn negative_timeout_is_an_error() {
        let cfg = ProcboundConfig {
            default_timeout_secs: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn zero_and_large_timeouts_warn() {
        let zero = ProcboundConfig {
            default_timeout_secs: Some(0.0),
            ..Default::default()
        };
        assert_eq!(validate_config(&zero).unwrap(), vec![ConfigWarning::ZeroTimeout]);

        let large = ProcboundConfig {
            default_timeout_secs: Some(7_200.0),
            ..Default::default()
        };
        assert_eq!(
            validate_config(&large).unwrap(),
            vec![ConfigWarning::LargeTimeout { secs: 7_200.0 }]
        );
    }

    #[test]
    fn bad_env_keys_are_errors() {
        let mut cfg = ProcboundConfig::default();
        cfg.env.insert("".into(), "x".into());
        cfg.env.insert("A=B".into(), "x".into());
        match validate_config(&cfg).unwrap_err() {
            ConfigError::ValidationError { reasons } => assert_eq!(reasons.len(), 2),
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn shadowing_path_warns() {
        let mut cfg = ProcboundConfig::default();
        cfg.env.insert("PATH".into(), "/opt/bin".into());
        let warnings = validate_config(&cfg).unwrap();
        assert_eq!(
            warnings,
            vec![ConfigWarning::ShadowedVariable { key: "PATH".into() }]
        );
    }

    #[test]
    fn merge_overlay_wins_and_env_combines() {
        let mut base = ProcboundConfig {
            default_timeout_secs: Some(10.0),
            shell: Some(true),
            ..Default::default()
        };
        base.env.insert("A".into(), "base".into());
        base.env.insert("B".into(), "base".into());

        let mut overlay = ProcboundConfig {
            default_timeout_secs: Some(1.0),
            log_level: None,
            shell: None,
            env: BTreeMap::new(),
        };
        overlay.env.insert("B".into(), "overlay".into());

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.default_timeout_secs, Some(1.0));
        assert_eq!(merged.shell, Some(true));
        assert_eq!(merged.log_level.as_deref(), Some("info"));
        assert_eq!(merged.env["A"], "base");
        assert_eq!(merged.env["B"], "overlay");
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("procbound.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "shell = true").unwrap();
        writeln!(f, "[env]").unwrap();
        writeln!(f, "FOO = \"bar\"").unwrap();
        drop(f);

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.shell, Some(true));
        assert_eq!(cfg.env["FOO"], "bar");
    }

    #[test]
    fn load_missing_file_gives_file_not_found() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = ProcboundConfig {
            default_timeout_secs: Some(3.0),
            ..Default::default()
        };
        cfg.env.insert("K".into(), "V".into());
        let text = toml::to_string(&cfg).unwrap();
        assert_eq!(parse_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn warning_display() {
        assert!(ConfigWarning::ZeroTimeout.to_string().contains("0s"));
        assert!(
            ConfigWarning::LargeTimeout { secs: 9000.0 }
                .to_string()
                .contains("9000")
        );
    }
}
