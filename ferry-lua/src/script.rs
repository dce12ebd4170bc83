//! Script execution
//!
//! Runs one `.lua` job executable to completion on the calling thread.
//! Arguments are available both as the chunk's varargs (`...`) and as the
//! conventional `arg` table (`arg[0]` is the script name). The exit code is
//! taken from the chunk's return value:
//!
//! | return value        | exit code |
//! |---------------------|-----------|
//! | nothing / `nil`     | 0         |
//! | integer or number   | that value |
//! | `true` / `false`    | 0 / 1     |
//!
//! A number that is not a whole `i32` reports exit code 1.

use mlua::{HookTriggers, Lua, Value, Variadic, VmState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::module::ModuleRegistry;
use crate::modules::{FsModule, LogModule, LogSink};
use crate::sandbox::create_sandbox;

/// How a script finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptExit {
    pub code: i32,
}

impl ScriptExit {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set up script runtime: {0}")]
    Setup(#[source] mlua::Error),

    #[error("script error: {0}")]
    Runtime(#[source] mlua::Error),

    #[error("script was cancelled")]
    Cancelled,
}

/// Instructions executed between checks of the cancel flag
const CANCEL_CHECK_INTERVAL: u32 = 1000;

/// Runs the script at `path` with `args`, confined to `workdir`
///
/// Blocks until the script returns; callers on an async runtime should use
/// `spawn_blocking`. Setting `cancel` stops the script at its next check,
/// and the call then fails with [`ScriptError::Cancelled`].
pub fn run_script<S: LogSink + 'static>(
    path: &Path,
    args: &[String],
    workdir: &Path,
    sink: S,
    cancel: Arc<AtomicBool>,
) -> Result<ScriptExit, ScriptError> {
    let source = std::fs::read(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut registry = ModuleRegistry::new();
    registry.register(LogModule::new(sink));
    registry.register(FsModule::new(workdir));

    let lua = create_sandbox(&registry).map_err(ScriptError::Setup)?;

    let script_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    set_arg_table(&lua, &script_name, args).map_err(ScriptError::Setup)?;
    install_cancel_hook(&lua, Arc::clone(&cancel)).map_err(ScriptError::Setup)?;

    let result: Value = lua
        .load(source)
        .set_name(format!("@{}", script_name))
        .call(Variadic::from_iter(args.iter().cloned()))
        .map_err(|e| {
            if cancel.load(Ordering::Relaxed) {
                ScriptError::Cancelled
            } else {
                ScriptError::Runtime(e)
            }
        })?;

    Ok(ScriptExit {
        code: exit_code(&result),
    })
}

fn set_arg_table(lua: &Lua, script_name: &str, args: &[String]) -> mlua::Result<()> {
    let arg = lua.create_table()?;
    arg.set(0, script_name)?;
    for (i, value) in args.iter().enumerate() {
        arg.set(i + 1, value.as_str())?;
    }
    lua.globals().set("arg", arg)
}

fn install_cancel_hook(lua: &Lua, cancel: Arc<AtomicBool>) -> mlua::Result<()> {
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(CANCEL_CHECK_INTERVAL),
        move |_lua, _debug| {
            if cancel.load(Ordering::Relaxed) {
                Err(mlua::Error::runtime("script cancelled"))
            } else {
                Ok(VmState::Continue)
            }
        },
    )
}

fn exit_code(value: &Value) -> i32 {
    match value {
        Value::Integer(i) => i32::try_from(*i).unwrap_or(1),
        Value::Number(n) if *n == 0.0 => 0,
        Value::Number(n) => {
            if n.fract() == 0.0 && *n >= f64::from(i32::MIN) && *n <= f64::from(i32::MAX) {
                *n as i32
            } else {
                1
            }
        }
        Value::Boolean(false) => 1,
        _ => 0,
    }
}
