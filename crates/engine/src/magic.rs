//! Magic variables: script globals that track the host's current focus.
//!
//! Derivation is a pure function of a [`ContextSnapshot`]. Each field is
//! derived independently; a host query that panics leaves only that field
//! absent. Installation rebinds every name on every refresh, so no global is
//! ever left holding a value from an older context.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use mlua::{IntoLua, Lua, Result as LuaResult, Value};

use binlua_core::{BasicBlock, BinaryView, Function, IlFunction, IlLevel, Section, Symbol};

use crate::bindings::{
    BlockUserData, FunctionUserData, IlUserData, SectionUserData, SymbolUserData, ViewUserData,
};
use crate::context::{ContextCache, ContextSnapshot};
use crate::logger::Logger;
use crate::value::{HexAddress, Selection};

/// Every global name managed by the synchronizer.
pub const MAGIC_NAMES: [&str; 15] = [
    "current_view",
    "bv",
    "current_function",
    "current_basic_block",
    "current_address",
    "here",
    "current_selection",
    "current_raw_offset",
    "current_sections",
    "current_symbol",
    "current_symbols",
    "current_comment",
    "current_llil",
    "current_mlil",
    "current_hlil",
];

/// The derived magic variable set.
#[derive(Clone, Default)]
pub struct MagicVariables {
    pub view: Option<Rc<dyn BinaryView>>,
    pub function: Option<Rc<dyn Function>>,
    pub block: Option<Rc<dyn BasicBlock>>,
    pub address: u64,
    pub selection: Selection,
    /// `None` when there is no view or the address has no file backing.
    pub raw_offset: Option<u64>,
    pub sections: Vec<Section>,
    pub symbol: Option<Symbol>,
    /// `None` (not empty) when no symbol is defined at the address.
    pub symbols: Option<Vec<Symbol>>,
    pub comment: String,
    pub llil: Option<Rc<IlFunction>>,
    pub mlil: Option<Rc<IlFunction>>,
    pub hlil: Option<Rc<IlFunction>>,
}

/// Run `derive`, falling back to `absent` if the host panics.
fn guarded<T>(logger: &Logger, field: &str, absent: T, derive: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(derive)) {
        Ok(value) => value,
        Err(_) => {
            logger.error(format_args!("Failed to derive {}; binding it as absent", field));
            absent
        }
    }
}

impl MagicVariables {
    pub fn derive(snapshot: &ContextSnapshot, logger: &Logger) -> Self {
        let view = snapshot.view.as_ref().and_then(|h| h.upgrade());
        let function = snapshot.function.as_ref().and_then(|h| h.upgrade());
        let block = snapshot.block.as_ref().and_then(|h| h.upgrade());
        let address = snapshot.address;
        let selection = Selection::new(snapshot.selection_start, snapshot.selection_end);

        let raw_offset = match &view {
            Some(v) => guarded(logger, "current_raw_offset", None, || {
                v.data_offset_for_address(address)
            }),
            None => None,
        };

        let sections = match &view {
            Some(v) => guarded(logger, "current_sections", Vec::new(), || v.sections_at(address)),
            None => Vec::new(),
        };

        let symbol = match &view {
            Some(v) => guarded(logger, "current_symbol", None, || v.symbol_at(address)),
            None => None,
        };
        let symbols = symbol.as_ref().map(|s| vec![s.clone()]);

        let comment = match &view {
            Some(v) => guarded(logger, "current_comment", String::new(), || {
                v.comment_at(address).unwrap_or_default()
            }),
            None => String::new(),
        };

        let il = |level: IlLevel| match &function {
            Some(f) => guarded(logger, level.short_name(), None, || f.il(level)),
            None => None,
        };
        let (llil, mlil, hlil) = (il(IlLevel::Low), il(IlLevel::Medium), il(IlLevel::High));

        Self {
            view,
            function,
            block,
            address,
            selection,
            raw_offset,
            sections,
            symbol,
            symbols,
            comment,
            llil,
            mlil,
            hlil,
        }
    }

    fn il_value(&self, lua: &Lua, il: &Option<Rc<IlFunction>>) -> LuaResult<Value> {
        match (il, &self.function) {
            (Some(il), Some(function)) => IlUserData {
                il: il.clone(),
                function: function.clone(),
            }
            .into_lua(lua),
            _ => Ok(Value::Nil),
        }
    }

    /// Script values for every name in [`MAGIC_NAMES`], in order.
    fn values(&self, lua: &Lua) -> Vec<LuaResult<Value>> {
        let view = self.view.clone().map(ViewUserData).into_lua(lua);
        let address = HexAddress(self.address).into_lua(lua);
        vec![
            view.clone(),
            view,
            self.function.clone().map(FunctionUserData).into_lua(lua),
            self.block.clone().map(BlockUserData).into_lua(lua),
            address.clone(),
            address,
            self.selection.into_lua(lua),
            self.raw_offset.map(HexAddress).into_lua(lua),
            self.sections
                .iter()
                .cloned()
                .map(SectionUserData)
                .collect::<Vec<_>>()
                .into_lua(lua),
            self.symbol.clone().map(SymbolUserData).into_lua(lua),
            self.symbols
                .clone()
                .map(|list| list.into_iter().map(SymbolUserData).collect::<Vec<_>>())
                .into_lua(lua),
            self.comment.as_str().into_lua(lua),
            self.il_value(lua, &self.llil),
            self.il_value(lua, &self.mlil),
            self.il_value(lua, &self.hlil),
        ]
    }

    /// Bind every magic name. A name whose value cannot be built is bound
    /// to nil. Returns the number of names that fell back.
    pub fn install(&self, lua: &Lua, logger: &Logger) -> usize {
        let globals = lua.globals();
        let mut failures = 0;
        for (name, value) in MAGIC_NAMES.iter().zip(self.values(lua)) {
            let value = value.unwrap_or_else(|e| {
                logger.error(format_args!("Failed to build {}: {}", name, e));
                failures += 1;
                Value::Nil
            });
            if let Err(e) = globals.set(*name, value) {
                logger.error(format_args!("Failed to bind {}: {}", name, e));
                failures += 1;
            }
        }
        failures
    }
}

/// Rebind the magic variables if the live context moved since the last
/// commit. Returns whether a rebind happened.
pub fn synchronize(lua: &Lua, context: &RefCell<ContextCache>, logger: &Logger) -> bool {
    let snapshot = {
        let cache = context.borrow();
        if !cache.has_changed() {
            logger.debug(format_args!("Context unchanged, skipping magic variable update"));
            return false;
        }
        cache.live.clone()
    };

    logger.debug(format_args!("Context changed, updating magic variables"));
    MagicVariables::derive(&snapshot, logger).install(lua, logger);
    context.borrow_mut().commit();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use binlua_core::memory::{load_view, MemoryView};
    use binlua_core::HostRef;

    const DB: &str = r#"
[view]
filename = "m.bin"
start = "0x401000"
data = "90909090c3"

[[segments]]
start = "0x401000"
length = 5
file_offset = 0x400

[[sections]]
name = ".text"
start = "0x401000"
length = 5
semantics = "read_only_code"

[[comments]]
address = "0x401004"
text = "ret"

[[functions]]
start = "0x401000"
name = "main"
mlil = ["return"]

[[functions.blocks]]
start = "0x401000"
end = "0x401005"
"#;

    fn context_for(view: &Rc<MemoryView>, address: u64) -> ContextSnapshot {
        let dyn_view: Rc<dyn BinaryView> = view.clone();
        let function = dyn_view.function_at(0x401000).unwrap();
        let block = function.block_at(address).unwrap();
        ContextSnapshot {
            view: Some(HostRef::new(&dyn_view)),
            function: Some(HostRef::new(&function)),
            block: Some(HostRef::new(&block)),
            address,
            selection_start: address,
            selection_end: address + 2,
        }
    }

    #[test]
    fn empty_context_is_all_absent() {
        let vars = MagicVariables::derive(&ContextSnapshot::default(), &Logger::default());
        assert!(vars.view.is_none());
        assert!(vars.raw_offset.is_none());
        assert!(vars.sections.is_empty());
        assert!(vars.symbol.is_none());
        assert!(vars.symbols.is_none());
        assert_eq!(vars.comment, "");
        assert!(vars.llil.is_none() && vars.mlil.is_none() && vars.hlil.is_none());
    }

    #[test]
    fn derived_from_live_view() {
        let view = load_view(DB).unwrap();
        // The function holds a weak back-reference; keep the view alive.
        let vars = MagicVariables::derive(&context_for(&view, 0x401004), &Logger::default());
        assert_eq!(vars.raw_offset, Some(0x404));
        assert_eq!(vars.sections.len(), 1);
        assert_eq!(vars.comment, "ret");
        assert!(vars.symbol.is_none());
        assert_eq!(vars.selection.length(), 2);
        assert!(vars.mlil.is_some());
        assert!(vars.llil.is_none());

        let vars = MagicVariables::derive(&context_for(&view, 0x401000), &Logger::default());
        assert_eq!(vars.symbol.unwrap().name, "main");
        assert_eq!(vars.symbols.unwrap().len(), 1);
    }

    #[test]
    fn stale_handles_bind_as_absent() {
        let view = load_view(DB).unwrap();
        let snapshot = context_for(&view, 0x401000);
        drop(view);
        let vars = MagicVariables::derive(&snapshot, &Logger::default());
        assert!(vars.view.is_none());
        assert!(vars.function.is_none());
        assert!(vars.raw_offset.is_none());
    }

    struct PanickyView;

    impl BinaryView for PanickyView {
        fn filename(&self) -> String {
            "panicky".into()
        }
        fn start(&self) -> u64 {
            0
        }
        fn length(&self) -> u64 {
            0
        }
        fn arch(&self) -> Option<String> {
            None
        }
        fn entry_point(&self) -> Option<u64> {
            None
        }
        fn data_offset_for_address(&self, _addr: u64) -> Option<u64> {
            panic!("no mapping service")
        }
        fn sections(&self) -> Vec<Section> {
            Vec::new()
        }
        fn symbols(&self) -> Vec<Symbol> {
            Vec::new()
        }
        fn symbol_at(&self, _addr: u64) -> Option<Symbol> {
            None
        }
        fn comment_at(&self, _addr: u64) -> Option<String> {
            Some("still here".into())
        }
        fn set_comment_at(&self, _addr: u64, _comment: &str) {}
        fn functions(&self) -> Vec<Rc<dyn Function>> {
            Vec::new()
        }
        fn read(&self, _addr: u64, _len: usize) -> Vec<u8> {
            Vec::new()
        }
        fn write(&self, _addr: u64, _data: &[u8]) -> usize {
            0
        }
        fn tag_types(&self) -> Vec<binlua_core::TagType> {
            Vec::new()
        }
        fn create_tag_type(&self, name: &str, icon: &str) -> binlua_core::TagType {
            binlua_core::TagType {
                name: name.into(),
                icon: icon.into(),
            }
        }
        fn tags_at(&self, _addr: u64) -> Vec<binlua_core::Tag> {
            Vec::new()
        }
        fn add_tag(&self, _addr: u64, _tag: binlua_core::Tag) -> bool {
            false
        }
        fn remove_tag(&self, _addr: u64, _tag: &binlua_core::Tag) -> bool {
            false
        }
        fn store_metadata(&self, _key: &str, _value: binlua_core::Metadata) {}
        fn query_metadata(&self, _key: &str) -> Option<binlua_core::Metadata> {
            None
        }
        fn remove_metadata(&self, _key: &str) {}
    }

    #[test]
    fn one_failing_field_does_not_abort_the_rest() {
        let view: Rc<dyn BinaryView> = Rc::new(PanickyView);
        let snapshot = ContextSnapshot {
            view: Some(HostRef::new(&view)),
            ..ContextSnapshot::default()
        };
        let vars = MagicVariables::derive(&snapshot, &Logger::default());
        assert!(vars.raw_offset.is_none());
        assert_eq!(vars.comment, "still here");
    }

    #[test]
    fn install_binds_every_name() {
        let lua = Lua::new();
        lua.globals().set("current_comment", 42).unwrap();
        let failures = MagicVariables::default().install(&lua, &Logger::default());
        assert_eq!(failures, 0);

        let comment: String = lua.load("current_comment").eval().unwrap();
        assert_eq!(comment, "");
        let here: String = lua.load("tostring(here)").eval().unwrap();
        assert_eq!(here, "0x0");
        assert!(lua.load("current_address == here").eval::<bool>().unwrap());
        assert!(lua.load("current_symbol == nil and current_raw_offset == nil").eval::<bool>().unwrap());
        assert!(lua.load("#current_sections == 0").eval::<bool>().unwrap());
    }

    #[test]
    fn synchronize_only_when_changed() {
        let lua = Lua::new();
        let logger = Logger::default();
        let context = RefCell::new(ContextCache::new());

        assert!(synchronize(&lua, &context, &logger));
        assert!(!synchronize(&lua, &context, &logger));

        context.borrow_mut().live.address = 0x2000;
        assert!(synchronize(&lua, &context, &logger));
        let here: String = lua.load("tostring(here)").eval().unwrap();
        assert_eq!(here, "0x2000");

        context.borrow_mut().live.address = 0x2000;
        assert!(!synchronize(&lua, &context, &logger));
    }
}
