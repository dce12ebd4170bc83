//! Server configuration

use ferry_runner::RunnerConfig;
use ferry_store::StoreConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: String,
    pub runner: RunnerConfig,
    pub store: StoreConfig,
}

impl ServerConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - FERRY_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - everything read by `RunnerConfig::from_env` and `StoreConfig::from_env`
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("FERRY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let runner = RunnerConfig::from_env()?;
        runner.validate()?;

        Ok(Self {
            bind_addr,
            runner,
            store: StoreConfig::from_env()?,
        })
    }
}
