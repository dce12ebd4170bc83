//! Ferry CLI
//!
//! Runs a job locally or submits it to a Ferry server.

mod api;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Ferry job runner CLI", long_about = None)]
struct Cli {
    /// Print pipeline logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config {
        verbose: cli.verbose,
    };

    let succeeded = handle_command(cli.command, &config).await?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
