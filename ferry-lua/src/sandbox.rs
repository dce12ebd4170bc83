//! Lua sandbox creation
//!
//! Job scripts get the pure-computation parts of the standard library
//! (tables, strings, math, utf8, coroutines) and whatever modules the caller
//! registers. There is no `io`, `os`, `package` or `debug`; file access goes
//! through the `fs` module, which is confined to the scratch directory.

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib};

use crate::module::ModuleRegistry;

/// Create a restricted Lua sandbox with the given modules registered
///
/// # Example
/// ```no_run
/// use ferry_lua::{FsModule, ModuleRegistry, create_sandbox};
///
/// let mut registry = ModuleRegistry::new();
/// registry.register(FsModule::new("/tmp/ferry/job"));
///
/// let lua = create_sandbox(&registry)?;
/// lua.load(r#"fs.write("out.txt", "3")"#).exec()?;
/// # Ok::<(), mlua::Error>(())
/// ```
pub fn create_sandbox(registry: &ModuleRegistry) -> LuaResult<Lua> {
    // Explicitly exclude: IO, OS, PACKAGE, DEBUG
    let lua = unsafe {
        Lua::unsafe_new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE,
            LuaOptions::default(),
        )
    };

    lua.globals().set("require", mlua::Nil)?;
    lua.globals().set("dofile", mlua::Nil)?;
    lua.globals().set("loadfile", mlua::Nil)?;

    registry.register_all(&lua)?;

    Ok(lua)
}
