//! Script-side value types: `HexAddress`, `Selection`, and address arguments.

use mlua::{
    AnyUserData, FromLua, Lua, MetaMethod, Result as LuaResult, UserData, UserDataFields,
    UserDataMethods, Value,
};

use binlua_core::parse_address;

// ============================================================================
// Address arguments
// ============================================================================

/// Interpret a Lua value as an address.
///
/// Accepts integers, integral floats, `HexAddress` userdata and `"0x…"` or
/// decimal strings.
pub fn address_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(i) => Some(*i as u64),
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u64::MAX as f64 => {
            Some(*n as u64)
        }
        Value::String(s) => parse_address(&s.to_string_lossy()),
        Value::UserData(ud) => ud.borrow::<HexAddress>().ok().map(|a| a.0),
        _ => None,
    }
}

/// A function argument that must be an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressArg(pub u64);

impl FromLua for AddressArg {
    fn from_lua(value: Value, _lua: &Lua) -> LuaResult<Self> {
        address_from_value(&value).map(AddressArg).ok_or_else(|| {
            mlua::Error::RuntimeError(format!(
                "expected an address, got {}",
                value.type_name()
            ))
        })
    }
}

// ============================================================================
// HexAddress
// ============================================================================

/// An address that displays as hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexAddress(pub u64);

impl std::fmt::Display for HexAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

fn operand(value: &Value, what: &str) -> LuaResult<u64> {
    address_from_value(value).ok_or_else(|| {
        mlua::Error::RuntimeError(format!(
            "attempt to {} HexAddress and {}",
            what,
            value.type_name()
        ))
    })
}

fn is_hex_address(value: &Value) -> bool {
    matches!(value, Value::UserData(ud) if ud.is::<HexAddress>())
}

impl UserData for HexAddress {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("value", |_, this| Ok(this.0 as i64));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_function(MetaMethod::Add, |_, (a, b): (Value, Value)| {
            let sum = operand(&a, "add")?.wrapping_add(operand(&b, "add")?);
            Ok(HexAddress(sum))
        });

        // address - address is a distance; address - n is an address
        methods.add_meta_function(MetaMethod::Sub, |lua, (a, b): (Value, Value)| {
            let lhs = operand(&a, "subtract")?;
            let rhs = operand(&b, "subtract")?;
            if is_hex_address(&a) && is_hex_address(&b) {
                Ok(Value::Integer(lhs.wrapping_sub(rhs) as i64))
            } else {
                HexAddress(lhs.wrapping_sub(rhs)).into_lua_value(lua)
            }
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other.borrow::<HexAddress>().map(|o| *o == *this).unwrap_or(false))
        });

        methods.add_meta_function(MetaMethod::Lt, |_, (a, b): (Value, Value)| {
            Ok(operand(&a, "compare")? < operand(&b, "compare")?)
        });

        methods.add_meta_function(MetaMethod::Le, |_, (a, b): (Value, Value)| {
            Ok(operand(&a, "compare")? <= operand(&b, "compare")?)
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.to_string()));
    }
}

impl HexAddress {
    fn into_lua_value(self, lua: &Lua) -> LuaResult<Value> {
        lua.create_userdata(self).map(Value::UserData)
    }
}

// ============================================================================
// Selection
// ============================================================================

/// A selected address range `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: u64,
    pub end: u64,
}

impl Selection {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Never negative: an inverted range has length zero.
    pub fn length(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Selection(0x{:x}-0x{:x}, {} bytes)",
            self.start,
            self.end,
            self.length()
        )
    }
}

impl UserData for Selection {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("start_addr", |_, this| Ok(HexAddress(this.start)));
        fields.add_field_method_get("end_addr", |_, this| Ok(HexAddress(this.end)));
        fields.add_field_method_set("start_addr", |_, this, addr: AddressArg| {
            this.start = addr.0;
            Ok(())
        });
        fields.add_field_method_set("end_addr", |_, this, addr: AddressArg| {
            this.end = addr.0;
            Ok(())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("length", |_, this, ()| Ok(this.length()));

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other.borrow::<Selection>().map(|o| *o == *this).unwrap_or(false))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.to_string()));
    }
}

/// Install the `HexAddress(n)` and `Selection(a, b)` constructors.
pub fn register_constructors(lua: &Lua) -> LuaResult<()> {
    let globals = lua.globals();

    let hex = lua.create_function(|_, addr: Option<AddressArg>| {
        Ok(HexAddress(addr.map(|a| a.0).unwrap_or(0)))
    })?;
    globals.set("HexAddress", hex)?;

    let selection = lua.create_function(|_, (start, end): (Option<AddressArg>, Option<AddressArg>)| {
        Ok(Selection::new(
            start.map(|a| a.0).unwrap_or(0),
            end.map(|a| a.0).unwrap_or(0),
        ))
    })?;
    globals.set("Selection", selection)?;

    Ok(())
}
