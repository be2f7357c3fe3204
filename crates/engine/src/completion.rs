//! Input completion over globals, keywords and dotted table paths.

use mlua::{Lua, Table, Value};

const KEYWORDS: [&str; 22] = [
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Sorted candidate names for the trailing word of `text`, each already
/// spliced back into the full line.
pub fn candidates(lua: &Lua, text: &str) -> Vec<String> {
    let word_start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (head, word) = text.split_at(word_start);

    let (path, partial) = match word.rfind('.') {
        Some(dot) => (&word[..dot], &word[dot + 1..]),
        None => ("", word),
    };

    let Some(table) = resolve_path(lua, path) else {
        return Vec::new();
    };

    let mut names: Vec<String> = table
        .pairs::<Value, Value>()
        .filter_map(|pair| match pair {
            Ok((Value::String(key), _)) => Some(key.to_string_lossy()),
            _ => None,
        })
        .filter(|key| is_identifier(key) && key.starts_with(partial))
        .collect();
    if path.is_empty() {
        names.extend(
            KEYWORDS
                .iter()
                .filter(|k| k.starts_with(partial))
                .map(|k| k.to_string()),
        );
    }
    names.sort();
    names.dedup();

    let prefix = if path.is_empty() {
        head.to_string()
    } else {
        format!("{}{}.", head, path)
    };
    names.into_iter().map(|name| format!("{}{}", prefix, name)).collect()
}

/// The `state`-th completion of `text`, or an empty string when there are
/// no more candidates.
pub fn complete_input(lua: &Lua, text: &str, state: usize) -> String {
    candidates(lua, text).into_iter().nth(state).unwrap_or_default()
}

fn resolve_path(lua: &Lua, path: &str) -> Option<Table> {
    let mut table = lua.globals();
    if path.is_empty() {
        return Some(table);
    }
    for segment in path.split('.') {
        table = match table.raw_get::<Value>(segment).ok()? {
            Value::Table(t) => t,
            _ => return None,
        };
    }
    Some(table)
}
