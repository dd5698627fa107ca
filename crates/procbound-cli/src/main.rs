// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use procbound_cli::commands::{
    EXIT_USAGE, RunArgs, build_request, exit_status, load_checked, schema_json,
};
use procbound_cli::format::{to_json, write_passthrough};
use procbound_core::{CancelToken, execute_with_cancel};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "procbound",
    version,
    about = "Run a command with a wall-clock timeout and reliable cleanup"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a command.
    Run {
        /// Timeout in seconds (fractional allowed; 0 or less kills at once).
        #[arg(long, short = 't', allow_negative_numbers = true)]
        timeout: Option<f64>,

        /// Extra environment variables as KEY=VALUE. Can be repeated.
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env_vars: Vec<String>,

        /// Run the command words through the shell, in their own process group.
        #[arg(long, conflicts_with = "exec")]
        shell: bool,

        /// Execute the command words directly (the default).
        #[arg(long)]
        exec: bool,

        /// Print a JSON report instead of replaying the child's output.
        #[arg(long)]
        json: bool,

        /// The command and its arguments.
        #[arg(trailing_var_arg = true, required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// Validate the config file and print warnings.
    Check,

    /// Print the JSON schema of the config file.
    Schema,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("procbound: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let (config, warnings) = load_checked(cli.config.as_deref())?;

    let filter = if cli.debug {
        EnvFilter::new("procbound=debug")
    } else {
        let level = config.log_level.as_deref().unwrap_or("info");
        EnvFilter::new(format!("procbound={level}"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    for w in &warnings {
        warn!(target: "procbound.cli", "config: {w}");
    }

    match cli.command {
        Commands::Run {
            timeout,
            env_vars,
            shell,
            exec,
            json,
            command,
        } => {
            let args = RunArgs {
                command,
                timeout,
                env_vars,
                shell,
                exec,
            };
            cmd_run(args, &config, json).await
        }
        Commands::Check => {
            println!("config ok ({} warning(s))", warnings.len());
            for w in &warnings {
                println!("warning: {w}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schema => {
            println!("{}", schema_json()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn cmd_run(
    args: RunArgs,
    config: &procbound_config::ProcboundConfig,
    json: bool,
) -> Result<ExitCode> {
    let request = build_request(&args, config)?;
    debug!(target: "procbound.cli", command = %request.command, timeout = ?request.timeout, "run");

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = execute_with_cancel(request, &cancel)
        .await
        .context("rejected command")?;

    if json {
        println!("{}", to_json(&outcome)?);
    } else {
        write_passthrough(&outcome, &mut std::io::stdout(), &mut std::io::stderr())
            .context("write child output")?;
    }
    Ok(ExitCode::from(exit_status(&outcome)))
}
