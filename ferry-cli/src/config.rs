//! Configuration module

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Install a log subscriber for local runs
    pub verbose: bool,
}
