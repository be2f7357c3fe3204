//! Conversion between `Metadata` and Lua values.

use std::collections::{BTreeMap, HashSet};

use mlua::{Lua, Result as LuaResult, Table, Value};

use binlua_core::Metadata;

pub fn metadata_to_lua(lua: &Lua, value: &Metadata) -> LuaResult<Value> {
    Ok(match value {
        Metadata::Bool(b) => Value::Boolean(*b),
        Metadata::Signed(i) => Value::Integer(*i),
        Metadata::Unsigned(u) => match i64::try_from(*u) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Number(*u as f64),
        },
        Metadata::Float(f) => Value::Number(*f),
        Metadata::String(s) => Value::String(lua.create_string(s)?),
        Metadata::Raw(bytes) => Value::String(lua.create_string(bytes)?),
        Metadata::Array(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for item in items {
                table.raw_push(metadata_to_lua(lua, item)?)?;
            }
            Value::Table(table)
        }
        Metadata::Map(entries) => {
            let table = lua.create_table_with_capacity(0, entries.len())?;
            for (key, item) in entries {
                table.raw_set(key.as_str(), metadata_to_lua(lua, item)?)?;
            }
            Value::Table(table)
        }
    })
}

/// Nesting limit for tables stored as metadata.
pub const MAX_METADATA_DEPTH: usize = 64;

pub fn metadata_from_lua(value: &Value) -> LuaResult<Metadata> {
    Converter::default().convert(value, 0)
}

#[derive(Default)]
struct Converter {
    visiting: HashSet<usize>,
}

impl Converter {
    fn convert(&mut self, value: &Value, depth: usize) -> LuaResult<Metadata> {
        match value {
            Value::Boolean(b) => Ok(Metadata::Bool(*b)),
            Value::Integer(i) => Ok(Metadata::Signed(*i)),
            Value::Number(n) => Ok(Metadata::Float(*n)),
            Value::String(s) => Ok(match s.to_str() {
                Ok(text) => Metadata::String(text.to_string()),
                Err(_) => Metadata::Raw(s.as_bytes().to_vec()),
            }),
            Value::Table(t) => {
                if depth >= MAX_METADATA_DEPTH {
                    return Err(mlua::Error::RuntimeError(format!(
                        "metadata nested deeper than {} tables",
                        MAX_METADATA_DEPTH
                    )));
                }
                let id = t.to_pointer() as usize;
                if !self.visiting.insert(id) {
                    return Err(mlua::Error::RuntimeError(
                        "cyclic table cannot be stored as metadata".to_string(),
                    ));
                }
                let result = self.table(t, depth);
                self.visiting.remove(&id);
                result
            }
            other => Err(mlua::Error::RuntimeError(format!(
                "cannot store a {} as metadata",
                other.type_name()
            ))),
        }
    }

    fn table(&mut self, table: &Table, depth: usize) -> LuaResult<Metadata> {
        let len = table.raw_len();
        let mut map = BTreeMap::new();
        let mut count = 0usize;

        for pair in table.pairs::<Value, Value>() {
            let (key, item) = pair?;
            count += 1;
            match key {
                Value::String(s) => {
                    map.insert(s.to_string_lossy(), self.convert(&item, depth + 1)?);
                }
                Value::Integer(i) if i >= 1 && (i as usize) <= len => {}
                other => {
                    return Err(mlua::Error::RuntimeError(format!(
                        "metadata keys must be strings, got {}",
                        other.type_name()
                    )))
                }
            }
        }

        if len > 0 && count == len {
            let mut items = Vec::with_capacity(len);
            for i in 1..=len {
                let item: Value = table.raw_get(i)?;
                items.push(self.convert(&item, depth + 1)?);
            }
            return Ok(Metadata::Array(items));
        }
        if len > 0 {
            return Err(mlua::Error::RuntimeError(
                "metadata tables must be either sequences or string-keyed maps".to_string(),
            ));
        }
        Ok(Metadata::Map(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from(code: &str) -> LuaResult<Metadata> {
        let lua = Lua::new();
        let value: Value = lua.load(code).eval().unwrap();
        metadata_from_lua(&value)
    }

    #[test]
    fn scalars_from_lua() {
        assert_eq!(from("true").unwrap(), Metadata::Bool(true));
        assert_eq!(from("-4").unwrap(), Metadata::Signed(-4));
        assert_eq!(from("2.5").unwrap(), Metadata::Float(2.5));
        assert_eq!(from("'hi'").unwrap(), Metadata::String("hi".into()));
        assert_eq!(from("'\\xff\\x00'").unwrap(), Metadata::Raw(vec![0xff, 0]));
    }

    #[test]
    fn containers_from_lua() {
        assert_eq!(
            from("{1, 'a'}").unwrap(),
            Metadata::Array(vec![Metadata::Signed(1), Metadata::from("a")])
        );
        let mut expected = BTreeMap::new();
        expected.insert("k".to_string(), Metadata::Bool(false));
        assert_eq!(from("{k = false}").unwrap(), Metadata::Map(expected));
        assert_eq!(from("{}").unwrap(), Metadata::Map(BTreeMap::new()));
    }

    #[test]
    fn unsupported_values_are_errors() {
        assert!(from("print").is_err());
        assert!(from("{[true] = 1}").is_err());
        assert!(from("{1, x = 2}").is_err());
    }

    #[test]
    fn cycles_and_deep_nesting_are_errors() {
        let err = from("local t = {}; t.self = t; return t").unwrap_err();
        assert!(err.to_string().contains("cyclic table"), "{}", err);
        assert!(from("local t = {}; return {t, t}").is_ok());
        let deep = "local t = {}; for i = 1, 100 do t = {t} end; return t";
        assert!(from(deep).unwrap_err().to_string().contains("nested deeper"));
    }

    #[test]
    fn to_lua_round_values() {
        let lua = Lua::new();
        let mut map = BTreeMap::new();
        map.insert("big".to_string(), Metadata::Unsigned(u64::MAX));
        map.insert("list".to_string(), Metadata::Array(vec![Metadata::Signed(7)]));
        let value = metadata_to_lua(&lua, &Metadata::Map(map)).unwrap();
        lua.globals().set("m", value).unwrap();

        let first: i64 = lua.load("m.list[1]").eval().unwrap();
        assert_eq!(first, 7);
        let big: f64 = lua.load("m.big").eval().unwrap();
        assert_eq!(big, u64::MAX as f64);
    }
}
