// binlua - Lua console for an analysis database

mod console;
mod exit_codes;
mod logging;
mod repl;

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;

use binlua_config::{LogLevel, Settings};
use binlua_core::memory::Database;
use binlua_core::{parse_address, BinaryView};
use binlua_engine::{EngineOptions, Logger, ScriptingProvider};

use console::StdioConsole;
use exit_codes::{execute_exit_code, EXIT_DATABASE, EXIT_INIT, EXIT_SCRIPT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "binlua")]
#[command(about = "Lua scripting console for a binary analysis database")]
#[command(version)]
#[command(after_help = "\
Examples:
  binlua --db sample.toml
  binlua --db sample.toml --address 0x401000 script.lua
  binlua --db sample.toml --selection 0x401000:0x401010")]
struct Cli {
    /// Analysis database (TOML)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Initial cursor address (defaults to the entry point)
    #[arg(long, value_name = "ADDR", value_parser = parse_addr_arg)]
    address: Option<u64>,

    /// Make the function starting at ADDR current
    #[arg(long, value_name = "ADDR", value_parser = parse_addr_arg)]
    function: Option<u64>,

    /// Initial selection
    #[arg(long, value_name = "START:END", value_parser = parse_selection_arg)]
    selection: Option<(u64, u64)>,

    /// Log level (off, error, warn, info, debug, trace). BINLUA_LOG takes extra filter directives
    #[arg(long, value_parser = parse_level_arg)]
    log_level: Option<LogLevel>,

    /// Settings file (defaults to the user config dir)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Script to run instead of starting the REPL
    script: Option<PathBuf>,
}

fn parse_addr_arg(text: &str) -> Result<u64, String> {
    parse_address(text).ok_or_else(|| format!("invalid address: '{}'", text))
}

fn parse_selection_arg(text: &str) -> Result<(u64, u64), String> {
    let (start, end) = text
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{}'", text))?;
    Ok((parse_addr_arg(start)?, parse_addr_arg(end)?))
}

fn parse_level_arg(text: &str) -> Result<LogLevel, String> {
    LogLevel::parse(text).ok_or_else(|| format!("unknown log level: '{}'", text))
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
}

impl CliError {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn run(cli: Cli) -> Result<u8, CliError> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    logging::init(cli.log_level.unwrap_or(settings.log_level));

    let view: Option<Rc<dyn BinaryView>> = match &cli.db {
        Some(path) => {
            let db = Database::load(path).map_err(|e| CliError::new(EXIT_DATABASE, e.to_string()))?;
            let view: Rc<dyn BinaryView> =
                db.build().map_err(|e| CliError::new(EXIT_DATABASE, e.to_string()))?;
            log::info!("Loaded {} ({} functions)", view.filename(), view.functions().len());
            Some(view)
        }
        None => None,
    };

    let provider = ScriptingProvider::new(
        EngineOptions::from_settings(&settings),
        Rc::new(StdioConsole),
        Logger::new("binlua"),
    );
    let session = provider.create_instance();
    if !session.is_initialized() {
        return Err(CliError::new(EXIT_INIT, ""));
    }

    session.set_current_binary_view(view.as_ref());
    let address = cli
        .address
        .or(cli.function)
        .or_else(|| view.as_ref().and_then(|v| v.entry_point()))
        .or_else(|| view.as_ref().map(|v| v.start()))
        .unwrap_or(0);
    repl::focus(&session, view.as_ref(), address);

    if let Some(start) = cli.function {
        let function = view.as_ref().and_then(|v| v.function_at(start));
        if function.is_none() {
            return Err(CliError::new(EXIT_USAGE, format!("no function at 0x{:x}", start)));
        }
        session.set_current_function(function.as_ref());
    }
    if let Some((start, end)) = cli.selection {
        session.set_current_selection(start, end);
    }

    match &cli.script {
        Some(script) => Ok(execute_exit_code(
            session.execute_script_input_from_filename(script),
        )),
        None => {
            repl::run(&session, view.as_ref())
                .map_err(|e| CliError::new(EXIT_SCRIPT_ERROR, e.to_string()))?;
            Ok(EXIT_SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(CliError { code, message }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            ExitCode::from(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_arguments() {
        assert_eq!(parse_selection_arg("0x10:0x20"), Ok((0x10, 0x20)));
        assert_eq!(parse_selection_arg("16:32"), Ok((16, 32)));
        assert!(parse_selection_arg("0x10").is_err());
        assert!(parse_selection_arg("0x10:zz").is_err());
    }

    #[test]
    fn cli_parses_all_flags() {
        let cli = Cli::try_parse_from([
            "binlua",
            "--db",
            "a.toml",
            "--address",
            "0x401000",
            "--selection",
            "1:2",
            "--log-level",
            "debug",
            "run.lua",
        ])
        .unwrap();
        assert_eq!(cli.address, Some(0x401000));
        assert_eq!(cli.selection, Some((1, 2)));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.script, Some(PathBuf::from("run.lua")));
    }
}
