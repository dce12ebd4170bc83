//! Core modules for job scripts
//!
//! - `log`: forwards messages (and `print`) to a caller-provided sink
//! - `fs`: reads and writes files in the job's scratch directory

pub mod fs;
pub mod log;

pub use fs::FsModule;
pub use log::{LogLevel, LogModule, LogSink};
