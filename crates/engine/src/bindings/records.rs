//! Value-record bindings: symbols, sections, tags, edges, IL functions.

use std::rc::Rc;

use mlua::{AnyUserData, MetaMethod, UserData, UserDataFields, UserDataMethods};

use binlua_core::{BlockEdge, Function, IlFunction, Section, Symbol, Tag, TagType};

use super::function::FunctionUserData;
use super::same_object;
use crate::value::HexAddress;

// ============================================================================
// Symbol
// ============================================================================

#[derive(Debug, Clone)]
pub struct SymbolUserData(pub Symbol);

impl UserData for SymbolUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("name", |_, this| Ok(this.0.name.clone()));
        fields.add_field_method_get("full_name", |_, this| Ok(this.0.name.clone()));
        fields.add_field_method_get("short_name", |_, this| Ok(this.0.short_name.clone()));
        fields.add_field_method_get("address", |_, this| Ok(HexAddress(this.0.address)));
        fields.add_field_method_get("type", |_, this| Ok(this.0.kind.label()));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other.borrow::<Self>().map(|o| o.0 == this.0).unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("<Symbol: {} @ 0x{:x}>", this.0.name, this.0.address))
        });
    }
}

// ============================================================================
// Section
// ============================================================================

#[derive(Debug, Clone)]
pub struct SectionUserData(pub Section);

impl UserData for SectionUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("name", |_, this| Ok(this.0.name.clone()));
        fields.add_field_method_get("start", |_, this| Ok(HexAddress(this.0.start)));
        fields.add_field_method_get("start_addr", |_, this| Ok(HexAddress(this.0.start)));
        fields.add_field_method_get("end", |_, this| Ok(HexAddress(this.0.end())));
        fields.add_field_method_get("end_addr", |_, this| Ok(HexAddress(this.0.end())));
        fields.add_field_method_get("length", |_, this| Ok(this.0.length));
        fields.add_field_method_get("type", |_, this| Ok(this.0.semantics.label()));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("permissions", |lua, this, ()| {
            let table = lua.create_table()?;
            table.set("read", true)?;
            table.set("write", this.0.semantics.is_writable())?;
            table.set("execute", this.0.semantics.is_executable())?;
            Ok(table)
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other.borrow::<Self>().map(|o| o.0 == this.0).unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!(
                "Section({}, 0x{:x}, {} bytes)",
                this.0.name, this.0.start, this.0.length
            ))
        });
    }
}

// ============================================================================
// Tags
// ============================================================================

#[derive(Debug, Clone)]
pub struct TagTypeUserData(pub TagType);

impl UserData for TagTypeUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("name", |_, this| Ok(this.0.name.clone()));
        fields.add_field_method_get("icon", |_, this| Ok(this.0.icon.clone()));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other.borrow::<Self>().map(|o| o.0 == this.0).unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("<TagType: '{}' ({})>", this.0.name, this.0.icon))
        });
    }
}

#[derive(Debug, Clone)]
pub struct TagUserData(pub Tag);

impl UserData for TagUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("type", |_, this| Ok(this.0.tag_type.clone()));
        fields.add_field_method_get("data", |_, this| Ok(this.0.data.clone()));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other.borrow::<Self>().map(|o| o.0 == this.0).unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            if this.0.data.is_empty() {
                Ok(format!("<Tag: '{}'>", this.0.tag_type))
            } else {
                Ok(format!("<Tag: '{}' = '{}'>", this.0.tag_type, this.0.data))
            }
        });
    }
}

// ============================================================================
// Control-flow edges
// ============================================================================

#[derive(Debug, Clone)]
pub struct EdgeUserData(pub BlockEdge);

impl UserData for EdgeUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("type", |_, this| Ok(this.0.kind.label()));
        fields.add_field_method_get("source", |_, this| Ok(HexAddress(this.0.source)));
        fields.add_field_method_get("target", |_, this| Ok(HexAddress(this.0.target)));
        fields.add_field_method_get("back_edge", |_, this| Ok(this.0.back_edge));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!(
                "<Edge: {} 0x{:x} -> 0x{:x}>",
                this.0.kind.label(),
                this.0.source,
                this.0.target
            ))
        });
    }
}

// ============================================================================
// IL functions
// ============================================================================

/// One IL form of a function. Instruction indices are zero-based.
#[derive(Clone)]
pub struct IlUserData {
    pub il: Rc<IlFunction>,
    pub function: Rc<dyn Function>,
}

impl UserData for IlUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("level", |_, this| Ok(this.il.level.short_name()));
        fields.add_field_method_get("instruction_count", |_, this| {
            Ok(this.il.instruction_count())
        });
        fields.add_field_method_get("basic_block_count", |_, this| {
            Ok(this.il.basic_block_count)
        });
        fields.add_field_method_get("instructions", |_, this| Ok(this.il.instructions.clone()));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("get_function", |_, this, ()| {
            Ok(FunctionUserData(this.function.clone()))
        });

        methods.add_method("get_text", |_, this, index: usize| {
            Ok(this.il.text(index).unwrap_or_default().to_string())
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<Self>()
                .map(|o| same_object(&o.il, &this.il))
                .unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!(
                "<{}: {} instructions>",
                this.il.level.short_name(),
                this.il.instruction_count()
            ))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binlua_core::{SectionSemantics, SymbolKind};
    use mlua::Lua;

    fn eval<T: mlua::FromLua>(lua: &Lua, code: &str) -> T {
        lua.load(code).eval().unwrap()
    }

    #[test]
    fn symbol_fields() {
        let lua = Lua::new();
        let sym = SymbolUserData(Symbol {
            name: "ns::main".into(),
            short_name: "main".into(),
            address: 0x401000,
            kind: SymbolKind::Function,
        });
        lua.globals().set("sym", sym.clone()).unwrap();
        lua.globals().set("twin", sym).unwrap();
        assert_eq!(eval::<String>(&lua, "sym.short_name"), "main");
        assert_eq!(eval::<String>(&lua, "sym.type"), "Function");
        assert_eq!(eval::<String>(&lua, "tostring(sym.address)"), "0x401000");
        assert_eq!(eval::<String>(&lua, "tostring(sym)"), "<Symbol: ns::main @ 0x401000>");
        assert!(eval::<bool>(&lua, "sym == twin"));
    }

    #[test]
    fn section_permissions() {
        let lua = Lua::new();
        let section = SectionUserData(Section {
            name: ".data".into(),
            start: 0x2000,
            length: 16,
            semantics: SectionSemantics::ReadWriteData,
        });
        lua.globals().set("s", section).unwrap();
        assert!(eval::<bool>(&lua, "s:permissions().write"));
        assert!(!eval::<bool>(&lua, "s:permissions().execute"));
        assert_eq!(eval::<String>(&lua, "s.type"), "data");
        assert_eq!(eval::<String>(&lua, "tostring(s)"), "Section(.data, 0x2000, 16 bytes)");
    }

    #[test]
    fn tag_display() {
        let lua = Lua::new();
        let bare = TagUserData(Tag { tag_type: "Bookmark".into(), data: String::new() });
        let full = TagUserData(Tag { tag_type: "Bug".into(), data: "overflow".into() });
        lua.globals().set("bare", bare).unwrap();
        lua.globals().set("full", full).unwrap();
        assert_eq!(eval::<String>(&lua, "tostring(bare)"), "<Tag: 'Bookmark'>");
        assert_eq!(eval::<String>(&lua, "tostring(full)"), "<Tag: 'Bug' = 'overflow'>");
    }
}
