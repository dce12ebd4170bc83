//! Ferry Runner
//!
//! Executes one job per call as a linear pipeline:
//!
//! ```text
//! START -> CLEAR -> DOWNLOAD -> EXECUTE -> UPLOAD -> DONE
//!            \          \          \          \
//!             +----------+----------+----------+--> FAILED
//! ```
//!
//! Architecture:
//! - Configuration: scratch root, bundle directory, transfer limit, exit policy
//! - Scratch: per-job working directory, cleared before staging
//! - Stager / Publisher: bounded parallel transfers between the object store and scratch
//! - Process runner: spawns the executable (or runs `.lua` scripts in-process)
//! - Service: the orchestrator that sequences the stages and records metrics

pub mod config;
pub mod error;
pub mod process;
pub mod publish;
pub mod scratch;
pub mod service;
pub mod stage;
mod transfer;

pub use config::RunnerConfig;
pub use error::{DownloadError, ExecutionError, JobError, ScratchClearError, UploadError};
pub use process::{ExitReport, ProcessRunner};
pub use publish::Publisher;
pub use scratch::{ScratchGuard, ScratchSpace};
pub use service::{ExecutionService, JobOutcome, StandardExecutionService};
pub use stage::Stager;
