//! Recursive pretty-printer for table results and `dump()`.
//!
//! Sequences print their elements in order; other keys are sorted by their
//! display text. Identifier keys print bare, anything else as `[key]`.
//! Integral numbers above the configured threshold print as hex.

use std::collections::HashSet;

use mlua::{Table, Value};

use crate::io::safe_stringify;
use crate::options::PrettyOptions;

pub fn pretty_print(value: &Value, options: &PrettyOptions) -> String {
    let mut printer = Printer {
        options,
        visiting: HashSet::new(),
    };
    printer.render(value, 0)
}

struct Printer<'a> {
    options: &'a PrettyOptions,
    /// Tables on the current path, by identity.
    visiting: HashSet<usize>,
}

impl Printer<'_> {
    fn render(&mut self, value: &Value, level: usize) -> String {
        match value {
            Value::Table(t) => self.render_table(t, level),
            Value::String(s) => quote(&s.to_string_lossy()),
            Value::Integer(i) if *i > 0 && (*i as u64) > self.options.hex_threshold => {
                format!("0x{:x}", i)
            }
            Value::Number(n)
                if n.fract() == 0.0 && *n > self.options.hex_threshold as f64 && *n < u64::MAX as f64 =>
            {
                format!("0x{:x}", *n as u64)
            }
            other => safe_stringify(other),
        }
    }

    fn render_table(&mut self, table: &Table, level: usize) -> String {
        if level >= self.options.max_depth {
            return "{...}".to_string();
        }
        let id = table.to_pointer() as usize;
        if !self.visiting.insert(id) {
            return "<cycle>".to_string();
        }

        let inner = self.pad(level + 1);
        let mut entries = Vec::new();

        let len = table.raw_len();
        for i in 1..=len {
            let item: Value = table.raw_get(i).unwrap_or(Value::Nil);
            entries.push(self.render(&item, level + 1));
        }

        let mut keyed: Vec<(String, Value, Value)> = table
            .pairs::<Value, Value>()
            .filter_map(Result::ok)
            .filter(|(k, _)| !is_sequence_key(k, len))
            .map(|(k, v)| (sort_key(&k), k, v))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, key, val) in &keyed {
            let key_text = match key {
                Value::String(s) if is_identifier(&s.to_string_lossy()) => s.to_string_lossy(),
                other => format!("[{}]", self.render(other, 0)),
            };
            entries.push(format!("{} = {}", key_text, self.render(val, level + 1)));
        }

        self.visiting.remove(&id);

        if entries.is_empty() {
            return "{}".to_string();
        }

        let last = entries.len() - 1;
        let mut lines = vec!["{".to_string()];
        for (i, entry) in entries.into_iter().enumerate() {
            let comma = if i < last { "," } else { "" };
            lines.push(format!("{}{}{}", inner, entry, comma));
        }
        lines.push(format!("{}}}", self.pad(level)));
        lines.join("\n")
    }

    fn pad(&self, level: usize) -> String {
        " ".repeat(level * self.options.indent_width)
    }
}

fn is_sequence_key(key: &Value, len: usize) -> bool {
    match key {
        Value::Integer(i) => *i >= 1 && (*i as usize) <= len,
        _ => false,
    }
}

fn sort_key(key: &Value) -> String {
    safe_stringify(key)
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{}\"", escaped)
}
