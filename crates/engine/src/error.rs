//! Error types for the scripting engine.

use std::fmt;
use std::path::PathBuf;

/// Errors raised while running scripts.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// The interpreter could not be created or prepared.
    Init(String),
    /// A script file could not be read.
    Io { path: PathBuf, message: String },
    /// The interpreter reported an error (syntax or runtime).
    Lua(String),
    /// Execution was stopped through the cancel handle.
    Cancelled,
    /// Execution exceeded the configured watchdog.
    TimedOut { secs: u64 },
    /// An execution is already in progress on this session.
    Busy,
    /// The session was closed or never initialized.
    Closed,
}

impl ScriptError {
    /// Whether the error stopped execution from outside the script.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut { .. })
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "Failed to initialize Lua state: {}", msg),
            Self::Io { path, message } => write!(f, "{}: {}", path.display(), message),
            Self::Lua(msg) => write!(f, "{}", msg),
            Self::Cancelled => write!(f, "execution cancelled"),
            Self::TimedOut { secs } => write!(f, "execution timeout ({}s limit)", secs),
            Self::Busy => write!(f, "a script is already running"),
            Self::Closed => write!(f, "Lua state not initialized"),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<mlua::Error> for ScriptError {
    fn from(e: mlua::Error) -> Self {
        Self::Lua(format_lua_error(&e))
    }
}

/// Format a Lua error for display.
pub(crate) fn format_lua_error(error: &mlua::Error) -> String {
    match error {
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::RuntimeError(msg) => match msg.find("\nstack traceback:") {
            Some(idx) => msg[..idx].to_string(),
            None => msg.clone(),
        },
        mlua::Error::CallbackError { cause, .. } => format_lua_error(cause),
        mlua::Error::WithContext { cause, .. } => format_lua_error(cause),
        _ => error.to_string(),
    }
}
