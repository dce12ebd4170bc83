use mlua::prelude::*;

/// Trait for modules exposed to job scripts.
///
/// Each module registers one global table (named by [`ScriptModule::id`])
/// into the sandbox before the script is loaded.
///
/// # Example
///
/// ```rust
/// use ferry_lua::ScriptModule;
/// use mlua::prelude::*;
///
/// struct VersionModule;
///
/// impl ScriptModule for VersionModule {
///     fn id(&self) -> &'static str {
///         "version"
///     }
///
///     fn register(&self, lua: &Lua) -> LuaResult<()> {
///         let table = lua.create_table()?;
///         table.set("major", 1)?;
///         lua.globals().set(self.id(), table)?;
///         Ok(())
///     }
/// }
/// ```
pub trait ScriptModule: Send + Sync {
    /// Returns the unique identifier for this module.
    ///
    /// Used as the global variable name in Lua. Must be a valid Lua
    /// identifier and unique across registered modules.
    fn id(&self) -> &'static str;

    /// Registers this module's functions and values into the Lua context.
    fn register(&self, lua: &Lua) -> LuaResult<()>;
}

/// Registry of modules to install into a sandbox
pub struct ModuleRegistry {
    modules: Vec<Box<dyn ScriptModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Registers a module
    ///
    /// # Panics
    /// Panics if a module with the same ID is already registered
    pub fn register<M: ScriptModule + 'static>(&mut self, module: M) {
        let id = module.id();
        if self.modules.iter().any(|m| m.id() == id) {
            panic!("Module with id '{}' is already registered", id);
        }
        self.modules.push(Box::new(module));
    }

    /// Registers all modules into a Lua context
    ///
    /// # Errors
    /// Returns the first error encountered during registration
    pub fn register_all(&self, lua: &Lua) -> LuaResult<()> {
        for module in &self.modules {
            module.register(lua)?;
        }
        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
