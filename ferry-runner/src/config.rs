//! Runner configuration
//!
//! Defines where jobs run (scratch root), where bundled executables live,
//! how many transfers may be in flight, and how process failures are treated.

use std::path::PathBuf;
use std::time::Duration;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory under which each job gets its own scratch directory
    pub scratch_root: PathBuf,

    /// Deployment directory holding bundled executables
    ///
    /// Also appended to the spawned process's PATH.
    pub bundle_dir: PathBuf,

    /// Maximum number of downloads/uploads in flight at once
    pub max_concurrent_transfers: usize,

    /// Proceed to upload when the executable exits non-zero
    pub continue_on_non_zero_exit: bool,

    /// Kill the executable after this long (None = wait indefinitely)
    pub execution_timeout: Option<Duration>,

    /// Leave the scratch directory in place after the job
    pub keep_scratch: bool,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new(scratch_root: PathBuf, bundle_dir: PathBuf) -> Self {
        Self {
            scratch_root,
            bundle_dir,
            max_concurrent_transfers: 16,
            continue_on_non_zero_exit: true,
            execution_timeout: None,
            keep_scratch: false,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - FERRY_SCRATCH_ROOT (default: <tmp>/ferry)
    /// - FERRY_BUNDLE_DIR (default: directory of the running binary)
    /// - FERRY_MAX_TRANSFERS (default: 16)
    /// - FERRY_CONTINUE_ON_NONZERO_EXIT (default: true)
    /// - FERRY_EXECUTION_TIMEOUT (seconds, default: unset)
    /// - FERRY_KEEP_SCRATCH (default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("FERRY_SCRATCH_ROOT") {
            config.scratch_root = PathBuf::from(root);
        }

        if let Ok(dir) = std::env::var("FERRY_BUNDLE_DIR") {
            config.bundle_dir = PathBuf::from(dir);
        }

        if let Ok(raw) = std::env::var("FERRY_MAX_TRANSFERS") {
            config.max_concurrent_transfers = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("FERRY_MAX_TRANSFERS must be a number, got '{}'", raw))?;
        }

        if let Ok(raw) = std::env::var("FERRY_CONTINUE_ON_NONZERO_EXIT") {
            config.continue_on_non_zero_exit = parse_bool("FERRY_CONTINUE_ON_NONZERO_EXIT", &raw)?;
        }

        if let Ok(raw) = std::env::var("FERRY_EXECUTION_TIMEOUT") {
            config.execution_timeout = Some(parse_timeout("FERRY_EXECUTION_TIMEOUT", &raw)?);
        }

        if let Ok(raw) = std::env::var("FERRY_KEEP_SCRATCH") {
            config.keep_scratch = parse_bool("FERRY_KEEP_SCRATCH", &raw)?;
        }

        Ok(config)
    }

    pub fn with_max_concurrent_transfers(mut self, limit: usize) -> Self {
        self.max_concurrent_transfers = limit;
        self
    }

    pub fn with_continue_on_non_zero_exit(mut self, enabled: bool) -> Self {
        self.continue_on_non_zero_exit = enabled;
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }

    pub fn with_keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scratch_root.as_os_str().is_empty() {
            anyhow::bail!("scratch_root cannot be empty");
        }

        if self.max_concurrent_transfers == 0 {
            anyhow::bail!("max_concurrent_transfers must be greater than 0");
        }

        if let Some(timeout) = self.execution_timeout {
            if timeout.is_zero() {
                anyhow::bail!("execution_timeout must be greater than 0");
            }
        }

        Ok(())
    }
}

fn parse_bool(name: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be a boolean, got '{}'", name, raw),
    }
}

/// Whole seconds
fn parse_timeout(name: &str, raw: &str) -> anyhow::Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| anyhow::anyhow!("{} must be a number of seconds, got '{}'", name, raw))
}

/// Directory containing the running binary
fn default_bundle_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("ferry"), default_bundle_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_concurrent_transfers, 16);
        assert!(config.continue_on_non_zero_exit);
        assert!(config.execution_timeout.is_none());
        assert!(!config.keep_scratch);
        assert!(config.scratch_root.ends_with("ferry"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::default();
        assert!(config.validate().is_ok());

        config.max_concurrent_transfers = 0;
        assert!(config.validate().is_err());

        config.max_concurrent_transfers = 4;
        config.execution_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());

        config.execution_timeout = Some(Duration::from_secs(30));
        assert!(config.validate().is_ok());

        config.scratch_root = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builders() {
        let config = RunnerConfig::new(PathBuf::from("/scratch"), PathBuf::from("/bundle"))
            .with_max_concurrent_transfers(2)
            .with_continue_on_non_zero_exit(false)
            .with_execution_timeout(Duration::from_secs(5))
            .with_keep_scratch(true);

        assert_eq!(config.scratch_root, PathBuf::from("/scratch"));
        assert_eq!(config.bundle_dir, PathBuf::from("/bundle"));
        assert_eq!(config.max_concurrent_transfers, 2);
        assert!(!config.continue_on_non_zero_exit);
        assert_eq!(config.execution_timeout, Some(Duration::from_secs(5)));
        assert!(config.keep_scratch);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("X", "30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("X", " 5 ").unwrap(), Duration::from_secs(5));

        let err = parse_timeout("FERRY_EXECUTION_TIMEOUT", "30s").unwrap_err();
        assert!(err.to_string().contains("FERRY_EXECUTION_TIMEOUT"));
        assert!(parse_timeout("X", "-1").is_err());
        assert!(parse_timeout("X", "").is_err());
    }
}
