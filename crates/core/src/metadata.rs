//! Structured metadata values stored on views.
//!
//! Metadata is heterogeneous: a key may hold a flag, a number, a string, raw
//! bytes, or nested containers. It is modelled as a closed tagged union so
//! every conversion at the scripting boundary is an exhaustive match.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
    Raw(Vec<u8>),
    Array(Vec<Metadata>),
    Map(BTreeMap<String, Metadata>),
}

impl Metadata {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Signed(_) => "signed",
            Self::Unsigned(_) => "unsigned",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Raw(_) => "raw",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of a numeric value, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Signed(v) => Some(*v),
            Self::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl From<bool> for Metadata {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Metadata {
    fn from(v: i64) -> Self {
        Self::Signed(v)
    }
}

impl From<u64> for Metadata {
    fn from(v: u64) -> Self {
        Self::Unsigned(v)
    }
}

impl From<f64> for Metadata {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Metadata {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Metadata {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}
