//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use binlua_core::memory::{load_view, MemoryView};
use binlua_engine::{
    EngineOptions, HostConsole, InputReadyState, Logger, ScriptingSession,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Output(String),
    Error(String),
    Warning(String),
    Ready(InputReadyState),
}

/// Console that records every event in arrival order.
#[derive(Default)]
pub struct Recorder {
    pub events: RefCell<Vec<Event>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn outputs(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Output(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Error(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}

impl HostConsole for Recorder {
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

pub fn session() -> (ScriptingSession, Rc<Recorder>) {
    session_with(EngineOptions::default())
}

pub fn session_with(options: EngineOptions) -> (ScriptingSession, Rc<Recorder>) {
    let console = Rc::new(Recorder::default());
    let session = ScriptingSession::new(options, console.clone(), Logger::new("binlua-test"));
    console.take();
    (session, console)
}

pub const DB: &str = r#"
[view]
filename = "sample.bin"
start = "0x401000"
arch = "x86_64"
entry_point = "0x401000"
data = "554889e5b800000000c390909090c3"

[[segments]]
start = "0x401000"
length = 15
file_offset = 0x400

[[sections]]
name = ".text"
start = "0x401000"
length = 15
semantics = "read_only_code"

[[symbols]]
name = "helper"
address = "0x40100e"
kind = "function"

[[comments]]
address = "0x401004"
text = "return value"

[[functions]]
start = "0x401000"
name = "main"
llil = ["push(rbp)", "rbp = rsp", "eax = 0", "<return> jump(pop)"]
mlil = ["return 0"]
hlil = ["return 0"]

[[functions.blocks]]
start = "0x401000"
end = "0x40100a"
instructions = 4

[[functions.variables]]
name = "var_8"
type = "int32_t"
kind = "stack"
storage = -8

[[functions]]
start = "0x40100e"

[[functions.blocks]]
start = "0x40100e"
end = "0x40100f"
"#;

pub fn sample_view() -> Rc<MemoryView> {
    load_view(DB).unwrap()
}
