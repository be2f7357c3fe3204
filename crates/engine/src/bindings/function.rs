//! Function, basic block and variable bindings.

use std::rc::Rc;

use mlua::{AnyUserData, MetaMethod, UserData, UserDataFields, UserDataMethods};

use binlua_core::{BasicBlock, Function, IlLevel, ResolvedVariable, VariableKind, VariableRef};

use super::records::{EdgeUserData, IlUserData, SymbolUserData};
use super::same_object;
use super::view::ViewUserData;
use crate::value::{AddressArg, HexAddress};

// ============================================================================
// Function
// ============================================================================

#[derive(Clone)]
pub struct FunctionUserData(pub Rc<dyn Function>);

impl FunctionUserData {
    pub fn il(&self, level: IlLevel) -> Option<IlUserData> {
        self.0.il(level).map(|il| IlUserData {
            il,
            function: self.0.clone(),
        })
    }
}

impl UserData for FunctionUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("start", |_, this| Ok(HexAddress(this.0.start())));
        fields.add_field_method_get("start_addr", |_, this| Ok(HexAddress(this.0.start())));
        fields.add_field_method_get("name", |_, this| Ok(this.0.name()));
        fields.add_field_method_get("symbol", |_, this| Ok(this.0.symbol().map(SymbolUserData)));
        fields.add_field_method_get("view", |_, this| Ok(this.0.view().map(ViewUserData)));
        fields.add_field_method_get("comment", |_, this| Ok(this.0.comment()));
        fields.add_field_method_get("basic_blocks", |_, this| {
            Ok(this
                .0
                .basic_blocks()
                .into_iter()
                .map(BlockUserData)
                .collect::<Vec<_>>())
        });
        fields.add_field_method_get("variables", |_, this| {
            Ok(this
                .0
                .variables()
                .into_iter()
                .map(|var| VariableUserData {
                    function: this.0.clone(),
                    var,
                })
                .collect::<Vec<_>>())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("get_basic_block_at", |_, this, addr: AddressArg| {
            Ok(this.0.block_at(addr.0).map(BlockUserData))
        });

        methods.add_method("get_variable_by_name", |_, this, name: String| {
            let found = this.0.variables().into_iter().find(|v| {
                this.0
                    .resolve_variable(v)
                    .map(|r| r.name == name)
                    .unwrap_or(false)
            });
            Ok(found.map(|var| VariableUserData {
                function: this.0.clone(),
                var,
            }))
        });

        methods.add_method("get_llil", |_, this, ()| Ok(this.il(IlLevel::Low)));
        methods.add_method("get_mlil", |_, this, ()| Ok(this.il(IlLevel::Medium)));
        methods.add_method("get_hlil", |_, this, ()| Ok(this.il(IlLevel::High)));

        methods.add_method("set_comment", |_, this, text: String| {
            this.0.set_comment(&text);
            Ok(())
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<Self>()
                .map(|o| same_object(&o.0, &this.0))
                .unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("<Function: {} @ 0x{:x}>", this.0.name(), this.0.start()))
        });
    }
}

// ============================================================================
// Basic block
// ============================================================================

#[derive(Clone)]
pub struct BlockUserData(pub Rc<dyn BasicBlock>);

impl BlockUserData {
    fn arch(&self) -> String {
        self.0
            .function()
            .and_then(|f| f.view())
            .and_then(|v| v.arch())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl UserData for BlockUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("start", |_, this| Ok(HexAddress(this.0.start())));
        fields.add_field_method_get("start_addr", |_, this| Ok(HexAddress(this.0.start())));
        fields.add_field_method_get("end", |_, this| Ok(HexAddress(this.0.end())));
        fields.add_field_method_get("end_addr", |_, this| Ok(HexAddress(this.0.end())));
        fields.add_field_method_get("length", |_, this| Ok(this.0.length()));
        fields.add_field_method_get("index", |_, this| Ok(this.0.index()));
        fields.add_field_method_get("function", |_, this| {
            Ok(this.0.function().map(FunctionUserData))
        });
        fields.add_field_method_get("instruction_count", |_, this| {
            Ok(this.0.instruction_count())
        });
        fields.add_field_method_get("outgoing_edges", |_, this| {
            Ok(this
                .0
                .outgoing_edges()
                .into_iter()
                .map(EdgeUserData)
                .collect::<Vec<_>>())
        });
        fields.add_field_method_get("incoming_edges", |_, this| {
            Ok(this
                .0
                .incoming_edges()
                .into_iter()
                .map(EdgeUserData)
                .collect::<Vec<_>>())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("contains", |_, this, addr: AddressArg| Ok(this.0.contains(addr.0)));

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<Self>()
                .map(|o| same_object(&o.0, &this.0))
                .unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!(
                "<BasicBlock: {}@0x{:x}-0x{:x} ({} bytes)>",
                this.arch(),
                this.0.start(),
                this.0.end(),
                this.0.length()
            ))
        });
    }
}

// ============================================================================
// Variables
// ============================================================================

/// Identity of a variable. Name and type are looked up on demand through
/// `resolve()`; nothing is cached on the handle.
#[derive(Clone)]
pub struct VariableUserData {
    pub function: Rc<dyn Function>,
    pub var: VariableRef,
}

impl VariableUserData {
    fn resolve(&self) -> Option<ResolvedVariable> {
        self.function.resolve_variable(&self.var)
    }
}

impl UserData for VariableUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("index", |_, this| Ok(this.var.index));
        fields.add_field_method_get("storage", |_, this| Ok(this.var.storage));
        fields.add_field_method_get("source_type", |_, this| Ok(this.var.kind.label()));
        fields.add_field_method_get("name", |_, this| Ok(this.resolve().map(|r| r.name)));
        fields.add_field_method_get("type", |_, this| {
            Ok(this.resolve().map(|r| r.type_name))
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("resolve", |_, this, ()| {
            Ok(this.resolve().map(ResolvedVariableUserData))
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<Self>()
                .map(|o| o.var == this.var && same_object(&o.function, &this.function))
                .unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            let resolved = this.resolve().unwrap_or(ResolvedVariable {
                name: format!("var_{}", this.var.index),
                type_name: "?".to_string(),
            });
            Ok(match this.var.kind {
                VariableKind::Stack => format!(
                    "<Variable: {} ({}) @ stack{:+}>",
                    resolved.name, resolved.type_name, this.var.storage
                ),
                VariableKind::Register => format!(
                    "<Variable: {} ({}) @ register>",
                    resolved.name, resolved.type_name
                ),
                kind => format!(
                    "<Variable: {} ({}) @ {}>",
                    resolved.name,
                    resolved.type_name,
                    kind.label()
                ),
            })
        });
    }
}

/// Immutable snapshot of a variable's name and type.
#[derive(Debug, Clone)]
pub struct ResolvedVariableUserData(pub ResolvedVariable);

impl UserData for ResolvedVariableUserData {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("name", |_, this| Ok(this.0.name.clone()));
        fields.add_field_method_get("type", |_, this| Ok(this.0.type_name.clone()));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{} {}", this.0.type_name, this.0.name))
        });
    }
}
