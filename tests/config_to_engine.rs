// SPDX-License-Identifier: MIT OR Apache-2.0
//! Config file → CLI request building → engine, without the binary.
#![cfg(unix)]

use procbound_cli::commands::{RunArgs, build_request, exit_status, load_checked};
use procbound_core::execute;
use std::time::Duration;

fn write_config(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("procbound.toml");
    std::fs::write(&path, body).unwrap();
    (dir, path)
}

#[tokio::test]
async fn config_env_and_shell_mode_reach_the_child() -> anyhow::Result<()> {
    let (_dir, path) = write_config("shell = true\n[env]\nPB_E2E = \"from-config\"\n");
    let (config, warnings) = load_checked(Some(&path))?;
    assert!(warnings.is_empty());

    let args = RunArgs {
        command: vec!["printf".into(), "%s".into(), "\"$PB_E2E\"".into()],
        env_vars: vec!["PB_EXTRA=1".into()],
        ..Default::default()
    };
    let outcome = execute(build_request(&args, &config)?).await?;
    assert_eq!(outcome.stdout_lossy(), "from-config");
    assert_eq!(exit_status(&outcome), 0);
    Ok(())
}

#[tokio::test]
async fn config_default_timeout_kills_long_runs() -> anyhow::Result<()> {
    let (_dir, path) = write_config("default_timeout_secs = 0.2\n");
    let (config, _) = load_checked(Some(&path))?;

    let args = RunArgs {
        command: vec!["sleep".into(), "10".into()],
        ..Default::default()
    };
    let request = build_request(&args, &config)?;
    assert_eq!(request.timeout, Some(Duration::from_millis(200)));

    let outcome = execute(request).await?;
    assert!(outcome.killed);
    assert_eq!(exit_status(&outcome), 124);
    Ok(())
}

#[tokio::test]
async fn zero_default_timeout_warns_and_still_kills() -> anyhow::Result<()> {
    let (_dir, path) = write_config("default_timeout_secs = 0.0\n");
    let (config, warnings) = load_checked(Some(&path))?;
    assert_eq!(warnings.len(), 1);

    let args = RunArgs {
        command: vec!["true".into()],
        ..Default::default()
    };
    let outcome = execute(build_request(&args, &config)?).await?;
    assert!(outcome.killed);
    Ok(())
}
