use std::fmt;

#[derive(Debug)]
pub enum DatabaseError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// Structurally valid but inconsistent description (bad block bounds, bad hex data).
    Validation(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "database parse error: {msg}"),
            Self::Validation(msg) => write!(f, "database validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for DatabaseError {}
