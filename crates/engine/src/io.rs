//! I/O bridge between the interpreter and the host console.
//!
//! Script-side `print`, `error` and `warn` are routed to the host's output,
//! error and warning channels and mirrored into the session log.

use std::rc::Rc;

use mlua::{AnyUserData, Function as LuaFunction, Lua, MetaMethod, MultiValue, Result as LuaResult, Value};

use crate::error::format_lua_error;
use crate::logger::Logger;

/// Readiness of the session for new input, as shown by the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputReadyState {
    NotReady,
    Ready,
}

/// The host side of the console: text sinks plus readiness notification.
///
/// Each call carries one rendered message without a trailing newline.
pub trait HostConsole {
    fn output(&self, text: &str);
    fn error(&self, text: &str);
    fn warning(&self, text: &str);
    fn input_ready_state_changed(&self, state: InputReadyState);
}

/// Render any Lua value as display text. Never fails.
pub fn safe_stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string_lossy(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Boolean(b) => b.to_string(),
        Value::Nil => "nil".to_string(),
        Value::UserData(ud) => userdata_to_string(ud),
        Value::Table(_) => "<table>".to_string(),
        Value::Function(_) => "<function>".to_string(),
        Value::Error(e) => format_lua_error(e),
        other => format!("<{}>", other.type_name()),
    }
}

/// Invoke the userdata's `__tostring` hook, swallowing any failure.
fn userdata_to_string(ud: &AnyUserData) -> String {
    let hook = ud
        .metatable()
        .ok()
        .and_then(|mt| mt.get::<Option<LuaFunction>>(MetaMethod::ToString.name()).ok())
        .flatten();

    if let Some(hook) = hook {
        if let Ok(Value::String(s)) = hook.call::<Value>(ud.clone()) {
            return s.to_string_lossy();
        }
    }
    "<userdata>".to_string()
}

/// Format a float the way Lua's `tostring` does (`%.14g`, integral floats
/// keep a `.0` suffix).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e14 {
        return format!("{:.1}", n);
    }

    let exp = n.abs().log10().floor() as i32;
    if !(-4..14).contains(&exp) {
        let formatted = format!("{:.13e}", n);
        let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (13 - exp).max(0) as usize;
        let formatted = format!("{:.*}", decimals, n);
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Routes rendered text to the console and the log.
pub struct IoBridge {
    console: Rc<dyn HostConsole>,
    logger: Logger,
}

impl IoBridge {
    pub fn new(console: Rc<dyn HostConsole>, logger: Logger) -> Self {
        Self { console, logger }
    }

    pub fn output(&self, text: &str) {
        self.console.output(text);
        self.logger.info(format_args!("Script output: {}", text));
    }

    pub fn error(&self, text: &str) {
        self.console.error(text);
        self.logger.error(format_args!("Script error: {}", text));
    }

    pub fn warning(&self, text: &str) {
        self.console.warning(text);
        self.logger.warn(format_args!("Script warning: {}", text));
    }

    pub fn ready_state(&self, state: InputReadyState) {
        self.console.input_ready_state_changed(state);
    }

    /// Replace `print`, `error` and `warn`. The stock `error` stays
    /// reachable as `raise`.
    pub fn install(self: &Rc<Self>, lua: &Lua) -> LuaResult<()> {
        let globals = lua.globals();

        let stock_error: Value = globals.get("error")?;
        globals.set("raise", stock_error)?;

        let bridge = Rc::clone(self);
        let print = lua.create_function(move |_, args: MultiValue| {
            let line = args.iter().map(safe_stringify).collect::<Vec<_>>().join("\t");
            bridge.output(&line);
            Ok(())
        })?;
        globals.set("print", print)?;

        let bridge = Rc::clone(self);
        let error = lua.create_function(move |_, message: Value| {
            bridge.error(&safe_stringify(&message));
            Ok(())
        })?;
        globals.set("error", error)?;

        let bridge = Rc::clone(self);
        let warn = lua.create_function(move |_, message: Value| {
            bridge.warning(&safe_stringify(&message));
            Ok(())
        })?;
        globals.set("warn", warn)?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// One console event, in arrival order.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Output(String),
        Error(String),
        Warning(String),
        Ready(InputReadyState),
    }

    #[derive(Default)]
    pub struct RecordingConsole {
        pub events: RefCell<Vec<Event>>,
    }

    impl RecordingConsole {
        pub fn outputs(&self) -> Vec<String> {
            self.collect(|e| match e {
                Event::Output(s) => Some(s.clone()),
                _ => None,
            })
        }

        pub fn errors(&self) -> Vec<String> {
            self.collect(|e| match e {
                Event::Error(s) => Some(s.clone()),
                _ => None,
            })
        }

        pub fn warnings(&self) -> Vec<String> {
            self.collect(|e| match e {
                Event::Warning(s) => Some(s.clone()),
                _ => None,
            })
        }

        fn collect(&self, f: impl Fn(&Event) -> Option<String>) -> Vec<String> {
            self.events.borrow().iter().filter_map(f).collect()
        }
    }

    impl HostConsole for RecordingConsole {
        fn output(&self, text: &str) {
            self.events.borrow_mut().push(Event::Output(text.to_string()));
        }
        fn error(&self, text: &str) {
            self.events.borrow_mut().push(Event::Error(text.to_string()));
        }
        fn warning(&self, text: &str) {
            self.events.borrow_mut().push(Event::Warning(text.to_string()));
        }
        fn input_ready_state_changed(&self, state: InputReadyState) {
            self.events.borrow_mut().push(Event::Ready(state));
        }
    }
}
