//! Lua scripting engine for a binary-analysis host.
//!
//! A [`ScriptingSession`] owns one interpreter. The host keeps it informed
//! of the current view, function, block, address and selection; scripts see
//! these as magic variables (`bv`, `here`, `current_function`, ...) and
//! reach the rest of the analysis database through the [`bindings`].

pub mod bindings;
pub mod completion;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod extensions;
pub mod io;
pub mod logger;
pub mod magic;
pub mod options;
pub mod pretty;
pub mod session;
pub mod utility;
pub mod value;

pub use context::{ContextCache, ContextSnapshot};
pub use error::ScriptError;
pub use evaluator::{CancelHandle, ScriptOutcome};
pub use io::{HostConsole, InputReadyState};
pub use logger::Logger;
pub use magic::MagicVariables;
pub use options::{EngineOptions, PrettyOptions};
pub use session::{ExecuteResult, ScriptingProvider, ScriptingSession};
pub use value::{HexAddress, Selection};
