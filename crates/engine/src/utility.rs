//! Script-level helpers: `dump`, `get_selected_data` and `write_at_cursor`.
//!
//! The helpers read the live context, not the committed snapshot, so they
//! see a selection the host changed after the last rebind.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::{Lua, Result as LuaResult, Value};

use crate::context::ContextCache;
use crate::logger::Logger;
use crate::options::PrettyOptions;
use crate::pretty::pretty_print;

pub fn install(
    lua: &Lua,
    context: Rc<RefCell<ContextCache>>,
    pretty: PrettyOptions,
    logger: &Logger,
) -> LuaResult<()> {
    let globals = lua.globals();

    // Extensions may ship their own dump.
    if globals.get::<Value>("dump")?.is_nil() {
        let dump = lua.create_function(move |_, value: Value| Ok(pretty_print(&value, &pretty)))?;
        globals.set("dump", dump)?;
    } else {
        logger.debug(format_args!("dump already defined, keeping existing definition"));
    }

    let ctx = Rc::clone(&context);
    let get_selected_data = lua.create_function(move |lua, ()| {
        let live = ctx.borrow().live.clone();
        let Some(view) = live.view.as_ref().and_then(|h| h.upgrade()) else {
            return lua.create_string("");
        };
        if live.selection_start >= live.selection_end {
            return lua.create_string("");
        }
        let len = usize::try_from(live.selection_end - live.selection_start).unwrap_or(usize::MAX);
        lua.create_string(view.read(live.selection_start, len))
    })?;
    globals.set("get_selected_data", get_selected_data)?;

    let ctx = context;
    let write_at_cursor = lua.create_function(move |_, data: Option<mlua::String>| {
        let Some(data) = data else {
            return Ok(false);
        };
        let live = ctx.borrow().live.clone();
        let Some(view) = live.view.as_ref().and_then(|h| h.upgrade()) else {
            return Ok(false);
        };
        let bytes = data.as_bytes();
        Ok(view.write(live.selection_start, &bytes) == bytes.len())
    })?;
    globals.set("write_at_cursor", write_at_cursor)?;

    logger.debug(format_args!("Utility functions installed"));
    Ok(())
}
