//! Extension loading.
//!
//! The first configured directory holding an `init.lua` wins. That
//! directory is prepended to `package.path` so the init script can
//! `require` its siblings. A failing extension is logged and skipped.

use std::fs;
use std::path::{Path, PathBuf};

use mlua::{Lua, Table};

use crate::error::format_lua_error;
use crate::logger::Logger;

pub const INIT_SCRIPT: &str = "init.lua";

/// The first directory in `dirs` containing an init script.
pub fn find_extension_dir(dirs: &[PathBuf]) -> Option<&Path> {
    dirs.iter()
        .map(PathBuf::as_path)
        .find(|dir| dir.join(INIT_SCRIPT).is_file())
}

/// Load extensions. Returns `true` if an init script ran to completion.
pub fn load_extensions(lua: &Lua, dirs: &[PathBuf], logger: &Logger) -> bool {
    let Some(dir) = find_extension_dir(dirs) else {
        logger.debug(format_args!("No {} found in extension directories", INIT_SCRIPT));
        return false;
    };
    let script = dir.join(INIT_SCRIPT);

    if let Err(e) = extend_package_path(lua, dir) {
        logger.warn(format_args!("Failed to extend package.path for {}: {}", dir.display(), e));
        return false;
    }

    let source = match fs::read_to_string(&script) {
        Ok(source) => source,
        Err(e) => {
            logger.warn(format_args!("Failed to read {}: {}", script.display(), e));
            return false;
        }
    };

    match lua
        .load(&source)
        .set_name(format!("@{}", script.display()))
        .exec()
    {
        Ok(()) => {
            logger.info(format_args!("Loaded extensions from {}", script.display()));
            true
        }
        Err(e) => {
            logger.warn(format_args!(
                "Failed to load extensions from {}: {}",
                script.display(),
                format_lua_error(&e)
            ));
            false
        }
    }
}

fn extend_package_path(lua: &Lua, dir: &Path) -> mlua::Result<()> {
    let package: Table = lua.globals().get("package")?;
    let current: String = package.get("path")?;
    package.set("path", format!("{}/?.lua;{}", dir.display(), current))
}
