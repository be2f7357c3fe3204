//! Scripting session: one interpreter bound to one host console.
//!
//! The host pushes focus changes through the `set_current_*` setters and
//! submits input through [`ScriptingSession::execute_script_input`]. Before
//! each execution the magic variables are rebound if the focus moved.
//!
//! Readiness is bracketed: every execution reports `NotReady` before running
//! and `Ready` after, on every exit path.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use mlua::{Lua, LuaOptions, StdLib, Value};

use binlua_core::{BasicBlock, BinaryView, Function, HostRef};

use crate::bindings;
use crate::completion;
use crate::context::ContextCache;
use crate::error::{format_lua_error, ScriptError};
use crate::evaluator::{self, CancelHandle, Evaluator, ScriptOutcome};
use crate::extensions;
use crate::io::{HostConsole, InputReadyState, IoBridge};
use crate::logger::Logger;
use crate::magic;
use crate::options::EngineOptions;
use crate::utility;

/// Globals removed in sandbox mode.
const SANDBOXED_GLOBALS: [&str; 8] = [
    "os", "io", "debug", "package", "require", "loadfile", "dofile", "load",
];

/// Result of one execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteResult {
    Successful,
    InvalidInput,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvalState {
    Idle,
    Evaluating,
}

/// Sets `NotReady` on creation and `Ready` on drop.
struct ReadyGuard<'a> {
    io: &'a IoBridge,
    state: &'a Cell<EvalState>,
}

impl<'a> ReadyGuard<'a> {
    fn new(io: &'a IoBridge, state: &'a Cell<EvalState>) -> Self {
        state.set(EvalState::Evaluating);
        io.ready_state(InputReadyState::NotReady);
        Self { io, state }
    }
}

impl Drop for ReadyGuard<'_> {
    fn drop(&mut self) {
        self.state.set(EvalState::Idle);
        self.io.ready_state(InputReadyState::Ready);
    }
}

pub struct ScriptingSession {
    lua: Option<Lua>,
    context: Rc<RefCell<ContextCache>>,
    io: Rc<IoBridge>,
    evaluator: Evaluator,
    state: Cell<EvalState>,
    logger: Logger,
}

impl ScriptingSession {
    /// Create a session. If the interpreter cannot be set up, the failure is
    /// reported once on the error channel and the session stays inert.
    pub fn new(options: EngineOptions, console: Rc<dyn HostConsole>, logger: Logger) -> Self {
        let io = Rc::new(IoBridge::new(console, logger.clone()));
        let context = Rc::new(RefCell::new(ContextCache::new()));

        let lua = match Self::create_interpreter(&options, &io, &context, &logger) {
            Ok(lua) => {
                logger.info(format_args!("Lua scripting session initialized"));
                io.ready_state(InputReadyState::Ready);
                Some(lua)
            }
            Err(e) => {
                io.error(&e.to_string());
                None
            }
        };

        Self {
            lua,
            context,
            io,
            evaluator: Evaluator::new(&options),
            state: Cell::new(EvalState::Idle),
            logger,
        }
    }

    fn create_interpreter(
        options: &EngineOptions,
        io: &Rc<IoBridge>,
        context: &Rc<RefCell<ContextCache>>,
        logger: &Logger,
    ) -> Result<Lua, ScriptError> {
        let init = |e: mlua::Error| ScriptError::Init(format_lua_error(&e));

        let lua = Lua::new_with(StdLib::ALL_SAFE, LuaOptions::default()).map_err(init)?;
        io.install(&lua).map_err(init)?;
        evaluator::capture_pcall(&lua).map_err(init)?;
        bindings::register_all(&lua, logger).map_err(init)?;

        if options.sandbox {
            let globals = lua.globals();
            for name in SANDBOXED_GLOBALS {
                globals.set(name, Value::Nil).map_err(init)?;
            }
            logger.debug(format_args!("Sandbox enabled, extensions skipped"));
        } else {
            extensions::load_extensions(&lua, &options.extension_dirs, logger);
        }

        utility::install(&lua, Rc::clone(context), options.pretty.clone(), logger).map_err(init)?;
        magic::synchronize(&lua, context, logger);
        Ok(lua)
    }

    pub fn is_initialized(&self) -> bool {
        self.lua.is_some()
    }

    // ========================================================================
    // Context setters
    // ========================================================================

    pub fn set_current_binary_view(&self, view: Option<&Rc<dyn BinaryView>>) {
        self.context.borrow_mut().live.view = view.map(HostRef::new);
    }

    pub fn set_current_function(&self, function: Option<&Rc<dyn Function>>) {
        self.context.borrow_mut().live.function = function.map(HostRef::new);
    }

    pub fn set_current_basic_block(&self, block: Option<&Rc<dyn BasicBlock>>) {
        self.context.borrow_mut().live.block = block.map(HostRef::new);
    }

    pub fn set_current_address(&self, addr: u64) {
        self.context.borrow_mut().live.address = addr;
    }

    pub fn set_current_selection(&self, start: u64, end: u64) {
        let mut cache = self.context.borrow_mut();
        cache.live.selection_start = start;
        cache.live.selection_end = end;
    }

    /// Whether the live focus differs from what the magic variables show.
    pub fn has_context_changed(&self) -> bool {
        self.context.borrow().has_changed()
    }

    // ========================================================================
    // Execution
    // ========================================================================

    fn begin(&self) -> Result<(&Lua, ReadyGuard<'_>), ExecuteResult> {
        let Some(lua) = self.lua.as_ref() else {
            self.io.error(&ScriptError::Closed.to_string());
            return Err(ExecuteResult::InvalidInput);
        };
        if self.state.get() == EvalState::Evaluating {
            self.io.error(&ScriptError::Busy.to_string());
            return Err(ExecuteResult::InvalidInput);
        }
        let guard = ReadyGuard::new(&self.io, &self.state);
        self.evaluator.reset_cancel();
        magic::synchronize(lua, &self.context, &self.logger);
        Ok((lua, guard))
    }

    fn interrupted(&self, error: &ScriptError) -> ExecuteResult {
        match error {
            ScriptError::Cancelled => self.io.warning(&error.to_string()),
            _ => self.io.error(&error.to_string()),
        }
        ExecuteResult::Cancelled
    }

    /// Evaluate one line of console input.
    pub fn execute_script_input(&self, input: &str) -> ExecuteResult {
        let (lua, _guard) = match self.begin() {
            Ok(started) => started,
            Err(result) => return result,
        };
        if input.trim().is_empty() {
            return ExecuteResult::Successful;
        }

        match self.evaluator.evaluate(lua, input) {
            ScriptOutcome::Output(text) => {
                self.io.output(&text);
                ExecuteResult::Successful
            }
            ScriptOutcome::Silent => ExecuteResult::Successful,
            ScriptOutcome::Failed(message) => {
                self.io.error(&message);
                ExecuteResult::InvalidInput
            }
            ScriptOutcome::Interrupted(e) => self.interrupted(&e),
        }
    }

    /// Run a script file as a statement block.
    pub fn execute_script_input_from_filename(&self, path: &Path) -> ExecuteResult {
        let (lua, _guard) = match self.begin() {
            Ok(started) => started,
            Err(result) => return result,
        };

        self.logger.debug(format_args!("Executing script file {}", path.display()));
        match self.evaluator.execute_file(lua, path) {
            Ok(()) => ExecuteResult::Successful,
            Err(e) if e.is_interrupt() => self.interrupted(&e),
            Err(e) => {
                self.io.error(&e.to_string());
                ExecuteResult::InvalidInput
            }
        }
    }

    /// Request that the running script stop. Safe to call when idle.
    pub fn cancel_script_input(&self) {
        self.evaluator.cancel_handle().cancel();
    }

    /// A handle that can cancel from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.evaluator.cancel_handle()
    }

    /// The `state`-th completion of `text`; empty when exhausted.
    pub fn complete_input(&self, text: &str, state: usize) -> String {
        match &self.lua {
            Some(lua) => completion::complete_input(lua, text, state),
            None => String::new(),
        }
    }

    /// Tear down the interpreter. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.lua.take().is_some() {
            self.logger.debug(format_args!("Lua scripting session closed"));
        }
    }
}

impl Drop for ScriptingSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Creates sessions that share options, console and logger.
pub struct ScriptingProvider {
    options: EngineOptions,
    console: Rc<dyn HostConsole>,
    logger: Logger,
}

impl ScriptingProvider {
    pub const NAME: &'static str = "Lua";
    pub const API_NAME: &'static str = "lua";

    pub fn new(options: EngineOptions, console: Rc<dyn HostConsole>, logger: Logger) -> Self {
        Self {
            options,
            console,
            logger,
        }
    }

    pub fn create_instance(&self) -> ScriptingSession {
        self.logger.debug(format_args!("Creating {} scripting instance", Self::NAME));
        ScriptingSession::new(
            self.options.clone(),
            Rc::clone(&self.console),
            self.logger.clone(),
        )
    }
}
