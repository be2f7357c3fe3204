//! Script-visible records for host objects.
//!
//! Every object reachable from a magic variable is wrapped in a userdata type
//! with a `__tostring` hook and an identity `__eq`. Queries with no result
//! return `nil` or an empty table, never an error.
//!
//! # API
//!
//! - `BinaryView`: `filename`, `start`, `end`, `length`, `arch`,
//!   `entry_point`, `functions`, `sections`, `symbols`, `tag_types`,
//!   `get_function_at(a)`, `get_functions_containing(a)`, `get_symbol_at(a)`,
//!   `get_sections_at(a)`, `get_comment_at(a)`, `set_comment_at(a, s)`,
//!   `read(a, n)`, `write(a, s)`, `get_tags_at(a)`, `add_tag(a, type, data)`,
//!   `remove_tag(a, tag)`, `create_tag_type(name, icon)`,
//!   `store_metadata(k, v)`, `query_metadata(k)`, `remove_metadata(k)`
//! - `Function`: `start`, `name`, `symbol`, `view`, `comment`,
//!   `basic_blocks`, `variables`, `get_basic_block_at(a)`,
//!   `get_llil()`, `get_mlil()`, `get_hlil()`, `set_comment(s)`
//! - `BasicBlock`: `start`, `end`, `length`, `index`, `function`,
//!   `instruction_count`, `outgoing_edges`, `incoming_edges`
//! - `Variable`: `index`, `storage`, `source_type`, `name`, `type`,
//!   `resolve()`
//!
//! Address arguments accept integers, `HexAddress` values or `"0x…"` strings.

pub mod function;
pub mod metadata;
pub mod records;
pub mod view;

pub use function::{BlockUserData, FunctionUserData, ResolvedVariableUserData, VariableUserData};
pub use records::{EdgeUserData, IlUserData, SectionUserData, SymbolUserData, TagTypeUserData, TagUserData};
pub use view::ViewUserData;

use std::rc::Rc;

use mlua::{Lua, Result as LuaResult};

use binlua_core::HostRef;

use crate::logger::Logger;
use crate::value;

/// Identity comparison for shared host objects.
pub(crate) fn same_object<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    HostRef::new(a) == HostRef::new(b)
}

/// Register global constructors. Host object types need no registration:
/// their metatables are created on first use.
pub fn register_all(lua: &Lua, logger: &Logger) -> LuaResult<()> {
    logger.debug(format_args!("Registering HexAddress and Selection constructors"));
    value::register_constructors(lua)?;
    logger.debug(format_args!("Bindings registration complete"));
    Ok(())
}
