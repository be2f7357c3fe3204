//! Line REPL driving a scripting session.

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use binlua_core::{parse_address, BinaryView};
use binlua_engine::ScriptingSession;

const HELP: &str = "\
Enter Lua to evaluate it. Expressions print their value.

Commands:
  .goto ADDR          move the cursor (also sets function and block)
  .select START END   set the selection
  .complete TEXT      list completions for TEXT
  .help               show this help
  .quit               exit";

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Script(String),
    Goto(u64),
    Select(u64, u64),
    Complete(String),
    Help,
    Quit,
    /// A malformed meta command, with the message to show.
    Invalid(String),
}

pub fn parse_line(line: &str) -> Line {
    let trimmed = line.trim();
    let Some(meta) = trimmed.strip_prefix('.') else {
        return Line::Script(line.to_string());
    };
    let (command, rest) = match meta.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (meta, ""),
    };

    match command {
        "goto" => match parse_address(rest) {
            Some(addr) => Line::Goto(addr),
            None => Line::Invalid(format!("bad address: '{}'", rest)),
        },
        "select" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            match parts.as_slice() {
                [start, end] => match (parse_address(start), parse_address(end)) {
                    (Some(start), Some(end)) => Line::Select(start, end),
                    _ => Line::Invalid(format!("bad selection: '{}'", rest)),
                },
                _ => Line::Invalid("usage: .select START END".to_string()),
            }
        }
        "complete" => Line::Complete(rest.to_string()),
        "help" => Line::Help,
        "quit" | "exit" => Line::Quit,
        other => Line::Invalid(format!("unknown command: .{}", other)),
    }
}

/// Point the session at `addr`: the first function containing it and its
/// block become current.
pub fn focus(session: &ScriptingSession, view: Option<&Rc<dyn BinaryView>>, addr: u64) {
    let function = view.and_then(|v| v.functions_containing(addr).into_iter().next());
    let block = function.as_ref().and_then(|f| f.block_at(addr));
    session.set_current_address(addr);
    session.set_current_function(function.as_ref());
    session.set_current_basic_block(block.as_ref());
}

/// Run until `.quit` or end of input.
pub fn run(session: &ScriptingSession, view: Option<&Rc<dyn BinaryView>>) -> io::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("binlua> ");
        io::stderr().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        match parse_line(&line) {
            Line::Script(text) => {
                session.execute_script_input(&text);
            }
            Line::Goto(addr) => focus(session, view, addr),
            Line::Select(start, end) => session.set_current_selection(start, end),
            Line::Complete(text) => {
                let mut state = 0;
                loop {
                    let candidate = session.complete_input(&text, state);
                    if candidate.is_empty() {
                        break;
                    }
                    println!("{}", candidate);
                    state += 1;
                }
            }
            Line::Help => println!("{}", HELP),
            Line::Quit => break,
            Line::Invalid(message) => eprintln!("error: {}", message),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_commands() {
        assert_eq!(parse_line(".goto 0x401000"), Line::Goto(0x401000));
        assert_eq!(parse_line("  .select 16 0x20 "), Line::Select(16, 0x20));
        assert_eq!(parse_line(".complete current_"), Line::Complete("current_".into()));
        assert_eq!(parse_line(".help"), Line::Help);
        assert_eq!(parse_line(".quit"), Line::Quit);
    }

    #[test]
    fn malformed_meta_commands() {
        assert!(matches!(parse_line(".goto nowhere"), Line::Invalid(_)));
        assert!(matches!(parse_line(".select 1"), Line::Invalid(_)));
        assert!(matches!(parse_line(".frobnicate"), Line::Invalid(_)));
    }

    #[test]
    fn everything_else_is_script() {
        assert_eq!(parse_line("print(1)"), Line::Script("print(1)".into()));
        assert_eq!(parse_line("x = .5"), Line::Script("x = .5".into()));
    }
}
