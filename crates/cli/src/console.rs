//! Standard stream console for the scripting session.

use std::io::{self, Write};

use binlua_engine::{HostConsole, InputReadyState};

/// Output to stdout, errors and warnings to stderr.
pub struct StdioConsole;

impl HostConsole for StdioConsole {
    fn output(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }

    fn error(&self, text: &str) {
        eprintln!("error: {}", text);
    }

    fn warning(&self, text: &str) {
        eprintln!("warning: {}", text);
    }

    fn input_ready_state_changed(&self, state: InputReadyState) {
        log::trace!("input ready state: {:?}", state);
    }
}
