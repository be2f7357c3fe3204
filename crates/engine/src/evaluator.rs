//! Script evaluation: expression-first, then statement mode.
//!
//! Console input is first compiled as `return <input>` so that typing an
//! expression shows its value. If that fails for any reason other than an
//! interrupt, the input runs again as a statement block. Only the statement
//! error is reported.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mlua::{Function, HookTriggers, Lua, MultiValue, Value, VmState};

use crate::error::{format_lua_error, ScriptError};
use crate::io::safe_stringify;
use crate::options::{EngineOptions, PrettyOptions};
use crate::pretty::pretty_print;

/// Chunk name used for console input.
const CONSOLE_CHUNK: &str = "=console";

/// A thread-safe handle that stops the running script at the next hook.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// What a console evaluation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// The input was an expression with a non-nil value.
    Output(String),
    /// Ran successfully with nothing to show.
    Silent,
    /// The statement form failed; carries the interpreter message.
    Failed(String),
    /// Stopped by the cancel handle or the watchdog.
    Interrupted(ScriptError),
}

pub struct Evaluator {
    cancel: CancelHandle,
    hook_interval: u32,
    timeout: Option<Duration>,
    pretty: PrettyOptions,
}

impl Evaluator {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            cancel: CancelHandle::default(),
            hook_interval: options.hook_interval.max(1),
            timeout: options.timeout,
            pretty: options.pretty.clone(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Clear a pending cancel request before a new run.
    pub fn reset_cancel(&self) {
        self.cancel.reset();
    }

    pub fn evaluate(&self, lua: &Lua, input: &str) -> ScriptOutcome {
        match self.run(lua, &format!("return {}", input), CONSOLE_CHUNK) {
            Ok(values) => return self.format_values(&values),
            Err(e) if e.is_interrupt() => return ScriptOutcome::Interrupted(e),
            Err(_) => {}
        }

        match self.run(lua, input, CONSOLE_CHUNK) {
            Ok(_) => ScriptOutcome::Silent,
            Err(e) if e.is_interrupt() => ScriptOutcome::Interrupted(e),
            Err(e) => ScriptOutcome::Failed(e.to_string()),
        }
    }

    /// Run a script file as a statement block. No expression retry.
    pub fn execute_file(&self, lua: &Lua, path: &Path) -> Result<(), ScriptError> {
        let source = fs::read_to_string(path).map_err(|e| ScriptError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.run(lua, &source, &format!("@{}", path.display()))?;
        Ok(())
    }

    fn run(&self, lua: &Lua, code: &str, name: &str) -> Result<MultiValue, ScriptError> {
        let start_time = Instant::now();
        let timeout = self.timeout;
        let cancel = self.cancel.clone();
        let was_timed_out = Arc::new(AtomicBool::new(false));
        let was_timed_out_clone = was_timed_out.clone();

        lua.set_hook(
            HookTriggers::new().every_nth_instruction(self.hook_interval),
            move |_lua, _debug| {
                if cancel.is_cancelled() {
                    return Err(mlua::Error::RuntimeError("execution cancelled".to_string()));
                }
                if let Some(limit) = timeout {
                    if start_time.elapsed() > limit {
                        was_timed_out_clone.store(true, Ordering::Relaxed);
                        return Err(mlua::Error::RuntimeError(format!(
                            "execution timeout ({}s limit)",
                            limit.as_secs()
                        )));
                    }
                }
                Ok(VmState::Continue)
            },
        );

        let result = protected_call(lua, code, name);

        lua.remove_hook();

        let failure = match result {
            Ok(Ok(values)) => return Ok(values),
            Ok(Err(value)) => render_error_value(&value),
            Err(e) => format_lua_error(&e),
        };
        if self.cancel.is_cancelled() {
            Err(ScriptError::Cancelled)
        } else if was_timed_out.load(Ordering::Relaxed) {
            Err(ScriptError::TimedOut {
                secs: timeout.map(|t| t.as_secs()).unwrap_or(0),
            })
        } else {
            Err(ScriptError::Lua(failure))
        }
    }

    fn format_values(&self, values: &MultiValue) -> ScriptOutcome {
        if values.iter().all(Value::is_nil) {
            return ScriptOutcome::Silent;
        }
        let parts: Vec<String> = values
            .iter()
            .map(|v| match v {
                Value::Table(_) => pretty_print(v, &self.pretty),
                other => safe_stringify(other),
            })
            .collect();
        ScriptOutcome::Output(parts.join(", "))
    }
}

/// Registry slot holding the stock `pcall`.
const PCALL_KEY: &str = "binlua.pcall";

/// Remember the stock `pcall` so scripts that replace the global cannot
/// change how failures are reported. Call before running user code.
pub fn capture_pcall(lua: &Lua) -> mlua::Result<()> {
    stock_pcall(lua).map(|_| ())
}

fn stock_pcall(lua: &Lua) -> mlua::Result<Function> {
    if let Some(pcall) = lua.named_registry_value::<Option<Function>>(PCALL_KEY)? {
        return Ok(pcall);
    }
    let pcall: Function = lua.globals().get("pcall")?;
    lua.set_named_registry_value(PCALL_KEY, pcall.clone())?;
    Ok(pcall)
}

/// Compile and run `code` under `pcall` so a failure keeps its raw error
/// value. The outer `Err` covers compile errors only.
fn protected_call(lua: &Lua, code: &str, name: &str) -> mlua::Result<Result<MultiValue, Value>> {
    // `into_function` rather than `eval`: statement mode must not be
    // reparsed as an expression.
    let chunk = lua.load(code).set_name(name).into_function()?;
    let mut values = stock_pcall(lua)?.call::<MultiValue>(chunk)?.into_iter();
    match values.next() {
        Some(Value::Boolean(true)) => Ok(Ok(values.collect())),
        _ => Ok(Err(values.next().unwrap_or(Value::Nil))),
    }
}

/// Error values render like any other value; interpreter errors lose their
/// traceback.
fn render_error_value(value: &Value) -> String {
    match value {
        Value::Error(e) => format_lua_error(e),
        other => safe_stringify(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn evaluator() -> Evaluator {
        Evaluator::new(&EngineOptions::default())
    }

    #[test]
    fn expressions_show_values() {
        let lua = Lua::new();
        let eval = evaluator();
        assert_eq!(eval.evaluate(&lua, "1 + 1"), ScriptOutcome::Output("2".into()));
        assert_eq!(eval.evaluate(&lua, "1, 'a'"), ScriptOutcome::Output("1, a".into()));
        assert_eq!(eval.evaluate(&lua, "{}"), ScriptOutcome::Output("{}".into()));
        assert_eq!(eval.evaluate(&lua, "nil"), ScriptOutcome::Silent);
    }

    #[test]
    fn statements_fall_back() {
        let lua = Lua::new();
        let eval = evaluator();
        assert_eq!(eval.evaluate(&lua, "x = 41"), ScriptOutcome::Silent);
        assert_eq!(eval.evaluate(&lua, "x + 1"), ScriptOutcome::Output("42".into()));
        assert_eq!(eval.evaluate(&lua, "for i = 1, 3 do x = x + i end"), ScriptOutcome::Silent);
        assert_eq!(eval.evaluate(&lua, "x"), ScriptOutcome::Output("47".into()));
    }

    #[test]
    fn only_the_statement_error_is_reported() {
        let lua = Lua::new();
        match evaluator().evaluate(&lua, "nonexistent_fn()") {
            ScriptOutcome::Failed(msg) => {
                assert!(msg.contains("nonexistent_fn"), "{}", msg);
                assert!(msg.starts_with("console:1:"), "{}", msg);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(matches!(
            evaluator().evaluate(&lua, "if then"),
            ScriptOutcome::Failed(_)
        ));
    }

    #[test]
    fn raised_values_are_stringified_safely() {
        let lua = Lua::new();
        let eval = evaluator();
        assert_eq!(eval.evaluate(&lua, "error({})"), ScriptOutcome::Failed("<table>".into()));
        assert_eq!(eval.evaluate(&lua, "error(42)"), ScriptOutcome::Failed("42".into()));
        assert_eq!(eval.evaluate(&lua, "error('plain', 0)"), ScriptOutcome::Failed("plain".into()));
    }

    #[test]
    fn shadowed_pcall_does_not_change_reporting() {
        let lua = Lua::new();
        let eval = evaluator();
        assert_eq!(eval.evaluate(&lua, "pcall = nil"), ScriptOutcome::Silent);
        assert_eq!(eval.evaluate(&lua, "error({})"), ScriptOutcome::Failed("<table>".into()));
    }

    #[test]
    fn expression_side_effects_run_once_on_success() {
        let lua = Lua::new();
        lua.load("n = 0; function bump() n = n + 1; return n end").exec().unwrap();
        let eval = evaluator();
        assert_eq!(eval.evaluate(&lua, "bump()"), ScriptOutcome::Output("1".into()));
        assert_eq!(eval.evaluate(&lua, "n"), ScriptOutcome::Output("1".into()));
    }

    #[test]
    fn cancel_stops_infinite_loop() {
        let lua = Lua::new();
        let eval = evaluator();
        let handle = eval.cancel_handle();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.cancel();
        });
        let outcome = eval.evaluate(&lua, "while true do end");
        canceller.join().unwrap();
        assert_eq!(outcome, ScriptOutcome::Interrupted(ScriptError::Cancelled));

        eval.reset_cancel();
        assert_eq!(eval.evaluate(&lua, "1"), ScriptOutcome::Output("1".into()));
    }

    #[test]
    fn watchdog_times_out() {
        let lua = Lua::new();
        let options = EngineOptions {
            timeout: Some(Duration::from_millis(20)),
            hook_interval: 100,
            ..EngineOptions::default()
        };
        let outcome = Evaluator::new(&options).evaluate(&lua, "while true do end");
        assert_eq!(
            outcome,
            ScriptOutcome::Interrupted(ScriptError::TimedOut { secs: 0 })
        );
    }

    #[test]
    fn files_run_without_retry() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("script.lua");
        fs::write(&path, "result = 6 * 7").unwrap();

        let lua = Lua::new();
        let eval = evaluator();
        eval.execute_file(&lua, &path).unwrap();
        assert_eq!(lua.globals().get::<i64>("result").unwrap(), 42);

        fs::write(&path, "1 + 1").unwrap();
        assert!(matches!(eval.execute_file(&lua, &path), Err(ScriptError::Lua(_))));

        let missing = dir.path().join("missing.lua");
        assert!(matches!(eval.execute_file(&lua, &missing), Err(ScriptError::Io { .. })));
    }
}
