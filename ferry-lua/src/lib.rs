//! Ferry Lua Runtime
//!
//! Job executables ending in `.lua` are not spawned as processes; they run
//! inside the runner on an embedded Lua 5.4 VM. This crate provides:
//! - Module trait and registry for the globals exposed to scripts
//! - The restricted sandbox scripts run in
//! - Core modules: `log` (routed to a [`LogSink`]) and `fs` (rooted at the job's scratch directory)
//! - [`run_script`], which loads a script file, passes it its arguments and reports its exit code

pub mod module;
pub mod modules;
pub mod sandbox;
pub mod script;

pub use module::{ModuleRegistry, ScriptModule};
pub use modules::{FsModule, LogLevel, LogModule, LogSink};
pub use sandbox::create_sandbox;
pub use script::{ScriptError, ScriptExit, run_script};

/// File extension that selects the embedded runtime
pub const SCRIPT_EXTENSION: &str = "lua";
