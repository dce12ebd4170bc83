//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod run;
mod submit;

pub use run::StoreKind;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use ferry_core::dto::response::JobResponse;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a job locally with the runner configured from the environment
    Run {
        /// Path to the job request JSON
        request: PathBuf,

        /// Object store backend
        #[arg(long, env = "FERRY_STORE", value_enum, default_value = "fs")]
        store: StoreKind,

        /// Root directory of the fs store
        #[arg(long, env = "FERRY_STORE_ROOT", default_value = "./store")]
        store_root: PathBuf,

        /// Endpoint of the http store
        #[arg(long, env = "FERRY_STORE_URL")]
        store_url: Option<String>,
    },
    /// Submit a job to a Ferry server
    Submit {
        /// Path to the job request JSON
        request: PathBuf,

        /// Server URL
        #[arg(long, env = "FERRY_SERVER_URL", default_value = "http://localhost:8080")]
        url: String,
    },
}

/// Handle a CLI command
///
/// Returns whether the job succeeded (status 200).
pub async fn handle_command(command: Commands, config: &Config) -> Result<bool> {
    let response = match command {
        Commands::Run {
            request,
            store,
            store_root,
            store_url,
        } => {
            let store = run::store_config(store, store_root, store_url)?;
            run::run_job(&request, store, config).await?
        }
        Commands::Submit { request, url } => submit::submit_job(&request, &url).await?,
    };

    print_response(&response);
    Ok(response.is_success())
}

fn read_request(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read request file {}", path.display()))
}

/// Print a job response
fn print_response(response: &JobResponse) {
    if response.is_success() {
        println!("{} {}", "✓".green(), format!("Status {}", response.status_code).bold());
        println!("  {}", response.body);
    } else {
        println!("{} {}", "✗".red(), format!("Status {}", response.status_code).bold());
        let message = response
            .error_message()
            .unwrap_or_else(|| response.body.clone());
        println!("  {}", message.red());
    }
}
