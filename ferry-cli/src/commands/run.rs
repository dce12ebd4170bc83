//! Local job execution

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use ferry_core::dto::response::JobResponse;
use ferry_runner::{ExecutionService, RunnerConfig, StandardExecutionService};
use ferry_store::StoreConfig;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Object store backend selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Fs,
    Http,
    Memory,
}

pub(super) fn store_config(
    kind: StoreKind,
    root: PathBuf,
    url: Option<String>,
) -> Result<StoreConfig> {
    Ok(match kind {
        StoreKind::Fs => StoreConfig::Fs { root },
        StoreKind::Http => match url {
            Some(endpoint) => StoreConfig::Http { endpoint },
            None => bail!("--store-url is required for the http store"),
        },
        StoreKind::Memory => StoreConfig::Memory,
    })
}

/// Runs the job in `request` in this process
pub(super) async fn run_job(request: &Path, store: StoreConfig, config: &Config) -> Result<JobResponse> {
    if config.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "ferry_runner=info".into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let body = super::read_request(request)?;

    let runner = RunnerConfig::from_env()?;
    runner.validate().context("Invalid runner configuration")?;
    let store = store.build().context("Failed to create object store")?;

    let service = StandardExecutionService::new(runner, store);
    Ok(service.handle(&body).await)
}
