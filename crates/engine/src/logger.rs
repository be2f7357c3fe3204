//! Per-session logger handle.
//!
//! Records go through the `log` facade; the handle only carries the target
//! name, so two sessions with different targets log independently and no
//! engine state is process-wide.

use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub struct Logger {
    target: Rc<str>,
}

impl Logger {
    pub fn new(target: &str) -> Self {
        Self {
            target: Rc::from(target),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        log::error!(target: self.target(), "{}", args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        log::warn!(target: self.target(), "{}", args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        log::info!(target: self.target(), "{}", args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        log::debug!(target: self.target(), "{}", args);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("binlua")
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("target", &self.target()).finish()
    }
}
