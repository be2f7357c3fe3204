//! Address parsing shared by the database loader, bindings and CLI.

use serde::Deserialize;

/// Parse an address written as decimal or `0x`-prefixed hex.
///
/// Underscores are accepted as digit separators (`0x40_1000`).
pub fn parse_address(text: &str) -> Option<u64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return None;
    }
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        cleaned.parse::<u64>().ok()
    }
}

/// An address as written in a database file: an integer or a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "AddressRepr")]
pub struct Address(pub u64);

impl Address {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressRepr {
    Int(u64),
    Text(String),
}

impl TryFrom<AddressRepr> for Address {
    type Error = String;

    fn try_from(repr: AddressRepr) -> Result<Self, Self::Error> {
        match repr {
            AddressRepr::Int(v) => Ok(Address(v)),
            AddressRepr::Text(s) => parse_address(&s)
                .map(Address)
                .ok_or_else(|| format!("invalid address '{s}'")),
        }
    }
}
