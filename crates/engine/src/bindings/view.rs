//! Binary view binding.

use std::rc::Rc;

use mlua::{AnyUserData, MetaMethod, UserData, UserDataFields, UserDataMethods, UserDataRef, Value};

use binlua_core::{BinaryView, Tag};

use super::function::FunctionUserData;
use super::metadata::{metadata_from_lua, metadata_to_lua};
use super::records::{SectionUserData, SymbolUserData, TagTypeUserData, TagUserData};
use super::same_object;
use crate::value::{AddressArg, HexAddress};

#[derive(Clone)]
pub struct ViewUserData(pub Rc<dyn BinaryView>);

/// A tag type given by name or as a `TagType` value.
fn tag_type_name(value: &Value) -> mlua::Result<String> {
    match value {
        Value::String(s) => Ok(s.to_string_lossy()),
        Value::UserData(ud) => ud
            .borrow::<TagTypeUserData>()
            .map(|t| t.0.name.clone())
            .map_err(|_| mlua::Error::RuntimeError("expected a TagType".to_string())),
        other => Err(mlua::Error::RuntimeError(format!(
            "expected a tag type name or TagType, got {}",
            other.type_name()
        ))),
    }
}

impl UserData for ViewUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("filename", |_, this| Ok(this.0.filename()));
        fields.add_field_method_get("file", |_, this| Ok(this.0.filename()));
        fields.add_field_method_get("start", |_, this| Ok(HexAddress(this.0.start())));
        fields.add_field_method_get("start_addr", |_, this| Ok(HexAddress(this.0.start())));
        fields.add_field_method_get("end", |_, this| Ok(HexAddress(this.0.end())));
        fields.add_field_method_get("end_addr", |_, this| Ok(HexAddress(this.0.end())));
        fields.add_field_method_get("length", |_, this| Ok(this.0.length()));
        fields.add_field_method_get("arch", |_, this| Ok(this.0.arch()));
        fields.add_field_method_get("entry_point", |_, this| {
            Ok(this.0.entry_point().map(HexAddress))
        });
        fields.add_field_method_get("functions", |_, this| {
            Ok(this
                .0
                .functions()
                .into_iter()
                .map(FunctionUserData)
                .collect::<Vec<_>>())
        });
        fields.add_field_method_get("sections", |_, this| {
            Ok(this
                .0
                .sections()
                .into_iter()
                .map(SectionUserData)
                .collect::<Vec<_>>())
        });
        fields.add_field_method_get("symbols", |_, this| {
            Ok(this
                .0
                .symbols()
                .into_iter()
                .map(SymbolUserData)
                .collect::<Vec<_>>())
        });
        fields.add_field_method_get("tag_types", |_, this| {
            Ok(this
                .0
                .tag_types()
                .into_iter()
                .map(TagTypeUserData)
                .collect::<Vec<_>>())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        // ====================================================================
        // Functions, symbols, sections
        // ====================================================================
        methods.add_method("get_function_at", |_, this, addr: AddressArg| {
            Ok(this.0.function_at(addr.0).map(FunctionUserData))
        });

        methods.add_method("get_functions_containing", |_, this, addr: AddressArg| {
            Ok(this
                .0
                .functions_containing(addr.0)
                .into_iter()
                .map(FunctionUserData)
                .collect::<Vec<_>>())
        });

        methods.add_method("get_symbol_at", |_, this, addr: AddressArg| {
            Ok(this.0.symbol_at(addr.0).map(SymbolUserData))
        });

        methods.add_method("get_sections_at", |_, this, addr: AddressArg| {
            Ok(this
                .0
                .sections_at(addr.0)
                .into_iter()
                .map(SectionUserData)
                .collect::<Vec<_>>())
        });

        methods.add_method("get_data_offset", |_, this, addr: AddressArg| {
            Ok(this.0.data_offset_for_address(addr.0))
        });

        // ====================================================================
        // Comments
        // ====================================================================
        methods.add_method("get_comment_at", |_, this, addr: AddressArg| {
            Ok(this.0.comment_at(addr.0).unwrap_or_default())
        });

        methods.add_method("set_comment_at", |_, this, (addr, text): (AddressArg, String)| {
            this.0.set_comment_at(addr.0, &text);
            Ok(())
        });

        // ====================================================================
        // Raw bytes
        // ====================================================================
        methods.add_method("read", |lua, this, (addr, len): (AddressArg, usize)| {
            lua.create_string(this.0.read(addr.0, len))
        });

        methods.add_method("write", |_, this, (addr, data): (AddressArg, mlua::String)| {
            Ok(this.0.write(addr.0, &data.as_bytes()))
        });

        // ====================================================================
        // Tags
        // ====================================================================
        methods.add_method("get_tag_type", |_, this, name: String| {
            Ok(this
                .0
                .tag_types()
                .into_iter()
                .find(|t| t.name == name)
                .map(TagTypeUserData))
        });

        methods.add_method("create_tag_type", |_, this, (name, icon): (String, Option<String>)| {
            Ok(TagTypeUserData(
                this.0.create_tag_type(&name, icon.as_deref().unwrap_or("")),
            ))
        });

        methods.add_method("get_tags_at", |_, this, addr: AddressArg| {
            Ok(this
                .0
                .tags_at(addr.0)
                .into_iter()
                .map(TagUserData)
                .collect::<Vec<_>>())
        });

        methods.add_method(
            "add_tag",
            |_, this, (addr, tag_type, data): (AddressArg, Value, Option<String>)| {
                let tag = Tag {
                    tag_type: tag_type_name(&tag_type)?,
                    data: data.unwrap_or_default(),
                };
                Ok(this.0.add_tag(addr.0, tag))
            },
        );

        methods.add_method(
            "remove_tag",
            |_, this, (addr, tag): (AddressArg, UserDataRef<TagUserData>)| {
                Ok(this.0.remove_tag(addr.0, &tag.0))
            },
        );

        // ====================================================================
        // Metadata
        // ====================================================================
        methods.add_method("store_metadata", |_, this, (key, value): (String, Value)| {
            this.0.store_metadata(&key, metadata_from_lua(&value)?);
            Ok(())
        });

        methods.add_method("query_metadata", |lua, this, key: String| {
            match this.0.query_metadata(&key) {
                Some(value) => metadata_to_lua(lua, &value),
                None => Ok(Value::Nil),
            }
        });

        methods.add_method("remove_metadata", |_, this, key: String| {
            this.0.remove_metadata(&key);
            Ok(())
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<Self>()
                .map(|o| same_object(&o.0, &this.0))
                .unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!(
                "<BinaryView: '{}', start 0x{:x}, len 0x{:x}>",
                this.0.filename(),
                this.0.start(),
                this.0.length()
            ))
        });
    }
}
