//! Logging module for job scripts
//!
//! Scripts call `log.info("...")` (or `debug`, `warning`, `error`). The global
//! `print` is replaced as well, so plain `print(...)` output lands in the same
//! sink at info level, the way a spawned process's stdout would.

use crate::module::ScriptModule;
use mlua::prelude::*;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Destination for script log output
///
/// Implementations must be Send to work with Lua's threading model.
pub trait LogSink: Send + Sync {
    fn write(&mut self, level: LogLevel, message: &str);
}

pub struct LogModule<S: LogSink> {
    sink: Arc<Mutex<S>>,
}

impl<S: LogSink> LogModule<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }
}

fn write_to<S: LogSink>(sink: &Mutex<S>, level: LogLevel, msg: &str) -> LuaResult<()> {
    sink.lock()
        .map_err(|e| LuaError::RuntimeError(format!("Failed to lock sink: {}", e)))?
        .write(level, msg);
    Ok(())
}

impl<S: LogSink + 'static> ScriptModule for LogModule<S> {
    fn id(&self) -> &'static str {
        "log"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let log_table = lua.create_table()?;

        for (name, level) in [
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warning", LogLevel::Warning),
            ("error", LogLevel::Error),
        ] {
            let sink = self.sink.clone();
            log_table.set(
                name,
                lua.create_function(move |_, msg: String| write_to(&sink, level, &msg))?,
            )?;
        }

        // print(...) joins its arguments with tabs, like the stock Lua print
        {
            let sink = self.sink.clone();
            lua.globals().set(
                "print",
                lua.create_function(move |_, args: LuaVariadic<LuaValue>| {
                    let parts = args
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<LuaResult<Vec<_>>>()?;
                    write_to(&sink, LogLevel::Info, &parts.join("\t"))
                })?,
            )?;
        }

        lua.globals().set(self.id(), log_table)?;
        Ok(())
    }
}
