//! Stderr logging for the `log` facade.

use env_logger::{Builder, Target};
use log::LevelFilter;

use binlua_config::LogLevel;

/// Environment variable holding extra filter directives.
pub const LOG_ENV: &str = "BINLUA_LOG";

pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Off => LevelFilter::Off,
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

fn builder(level: LogLevel) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(level_filter(level))
        .parse_env(LOG_ENV)
        .target(Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false);
    builder
}

/// Install the logger. Later calls keep the first logger.
pub fn init(level: LogLevel) {
    let _ = builder(level).try_init();
}
