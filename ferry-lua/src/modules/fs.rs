//! File module for job scripts
//!
//! Gives scripts access to the job's scratch directory and nothing else.
//! Every name must be a bare file name; paths with separators are rejected.
//!
//! - `fs.read(name) -> string`
//! - `fs.write(name, data)`
//! - `fs.append(name, data)`
//! - `fs.exists(name) -> boolean`
//! - `fs.list() -> { name, ... }` (sorted)

use crate::module::ScriptModule;
use ferry_core::domain::job::is_bare_file_name;
use mlua::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct FsModule {
    root: PathBuf,
}

impl FsModule {
    /// Creates a module rooted at `root` (the job's scratch directory)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn resolve(root: &Path, name: &str) -> LuaResult<PathBuf> {
    if !is_bare_file_name(name) {
        return Err(LuaError::RuntimeError(format!(
            "'{}' is not a plain file name",
            name
        )));
    }
    Ok(root.join(name))
}

impl ScriptModule for FsModule {
    fn id(&self) -> &'static str {
        "fs"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let fs_table = lua.create_table()?;

        {
            let root = self.root.clone();
            fs_table.set(
                "read",
                lua.create_function(move |lua, name: String| {
                    let data = std::fs::read(resolve(&root, &name)?).map_err(LuaError::external)?;
                    lua.create_string(&data)
                })?,
            )?;
        }

        {
            let root = self.root.clone();
            fs_table.set(
                "write",
                lua.create_function(move |_, (name, data): (String, LuaString)| {
                    std::fs::write(resolve(&root, &name)?, &*data.as_bytes())
                        .map_err(LuaError::external)
                })?,
            )?;
        }

        {
            let root = self.root.clone();
            fs_table.set(
                "append",
                lua.create_function(move |_, (name, data): (String, LuaString)| {
                    let mut file = std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(resolve(&root, &name)?)
                        .map_err(LuaError::external)?;
                    file.write_all(&data.as_bytes()).map_err(LuaError::external)
                })?,
            )?;
        }

        {
            let root = self.root.clone();
            fs_table.set(
                "exists",
                lua.create_function(move |_, name: String| Ok(resolve(&root, &name)?.exists()))?,
            )?;
        }

        {
            let root = self.root.clone();
            fs_table.set(
                "list",
                lua.create_function(move |lua, ()| {
                    let mut names = Vec::new();
                    for entry in std::fs::read_dir(&root).map_err(LuaError::external)? {
                        let entry = entry.map_err(LuaError::external)?;
                        names.push(entry.file_name().to_string_lossy().into_owned());
                    }
                    names.sort();
                    lua.create_sequence_from(names)
                })?,
            )?;
        }

        lua.globals().set(self.id(), fs_table)?;
        Ok(())
    }
}
