//! Engine options, decoupled from the settings file.

use std::path::PathBuf;
use std::time::Duration;

use binlua_config::Settings;

/// Pretty-printer policy for table results and `dump()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrettyOptions {
    /// Integral numbers strictly above this render as `0x…`.
    pub hex_threshold: u64,
    pub indent_width: usize,
    pub max_depth: usize,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self {
            hex_threshold: 4096,
            indent_width: 2,
            max_depth: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub pretty: PrettyOptions,
    pub sandbox: bool,
    pub timeout: Option<Duration>,
    pub hook_interval: u32,
    pub extension_dirs: Vec<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            pretty: PrettyOptions::default(),
            sandbox: false,
            timeout: None,
            hook_interval: 10_000,
            extension_dirs: Vec::new(),
        }
    }
}

impl EngineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            pretty: PrettyOptions {
                hex_threshold: settings.hex_threshold,
                indent_width: settings.indent_width,
                max_depth: settings.max_depth,
            },
            sandbox: settings.sandbox,
            timeout: settings.timeout_secs.map(Duration::from_secs),
            hook_interval: settings.hook_interval.max(1),
            extension_dirs: settings.extension_dirs.clone(),
        }
    }
}
