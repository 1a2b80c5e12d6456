// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! af: automated-fix orchestrator CLI

mod color;
mod commands;
mod config;
mod env;
mod exit_error;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::run::RunArgs;
use config::Config;
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "af", version, styles = color::styles())]
#[command(about = "Automated violation remediation")]
struct Cli {
    /// Config file (default: <state_dir>/autofix.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Print the final job snapshot as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an automation job for a target until it finishes
    Run(RunArgs),
}

async fn run(cli: Cli) -> Result<()> {
    let state_dir = env::state_dir()?;
    let config = Config::load(cli.config.as_deref(), &state_dir)?;
    let _log_guard = logging::init(&state_dir)?;
    tracing::debug!(state_dir = %state_dir.display(), "configuration loaded");

    match cli.command {
        Commands::Run(args) => commands::run::handle(args, config, &state_dir, cli.json).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ExitError>() {
            Some(exit) => {
                if !exit.message.is_empty() {
                    eprintln!("{}", exit.message);
                }
                ExitCode::from(exit.code)
            }
            None => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
