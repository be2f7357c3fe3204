// Engine and shell settings
// Loaded from ~/.config/binlua/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Log verbosity accepted by `logging.level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Pretty-printer
    /// Integral numbers strictly above this render as hex
    #[serde(rename = "pretty.hexThreshold")]
    pub hex_threshold: u64,

    #[serde(rename = "pretty.indentWidth")]
    pub indent_width: usize,

    /// Tables nested deeper than this render as `{...}`
    #[serde(rename = "pretty.maxDepth")]
    pub max_depth: usize,

    // Scripting
    /// Strip os/io/debug/package and file loaders from the interpreter
    #[serde(rename = "scripting.sandbox")]
    pub sandbox: bool,

    #[serde(rename = "scripting.timeoutSecs")]
    pub timeout_secs: Option<u64>,  // None = no watchdog

    /// Instructions between cancellation checks
    #[serde(rename = "scripting.hookInterval")]
    pub hook_interval: u32,

    #[serde(rename = "scripting.extensionDirs")]
    pub extension_dirs: Vec<PathBuf>,

    // Logging
    #[serde(rename = "logging.level")]
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Pretty-printer
            hex_threshold: 4096,
            indent_width: 2,
            max_depth: 32,
            // Scripting
            sandbox: false,
            timeout_secs: None,
            hook_interval: 10_000,
            extension_dirs: vec![Self::config_dir().join("lua-api")],
            // Logging
            log_level: LogLevel::Info,
        }
    }
}

impl Settings {
    /// Per-user configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("binlua")
    }

    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Load settings from the user config dir, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from an explicit file. Missing or invalid files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("Error parsing {}: {}", path.display(), e);
                    eprintln!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring `//` comment lines
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Pretty-printer used for table results and dump()
    "pretty.hexThreshold": 4096,
    "pretty.indentWidth": 2,
    "pretty.maxDepth": 32,

    // Scripting
    // sandbox removes os, io, debug, package, require and the file loaders
    "scripting.sandbox": false,
    "scripting.timeoutSecs": null,
    "scripting.hookInterval": 10000,

    // Logging: "off", "error", "warn", "info", "debug", "trace"
    "logging.level": "info"
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            eprintln!("Error writing default settings.json: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.hex_threshold, 4096);
        assert_eq!(s.indent_width, 2);
        assert!(!s.sandbox);
        assert_eq!(s.timeout_secs, None);
        assert_eq!(s.log_level, LogLevel::Info);
        assert!(s.extension_dirs[0].ends_with("lua-api"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let s = Settings::parse(
            r#"{
    // hex everything
    "pretty.hexThreshold": 0,
    "scripting.timeoutSecs": 5
}"#,
        )
        .unwrap();
        assert_eq!(s.hex_threshold, 0);
        assert_eq!(s.timeout_secs, Some(5));
        assert_eq!(s.max_depth, 32);
        assert_eq!(s.hook_interval, 10_000);
    }

    #[test]
    fn unknown_level_is_an_error() {
        assert!(Settings::parse(r#"{"logging.level": "loud"}"#).is_err());
        let s = Settings::parse(r#"{"logging.level": "debug"}"#).unwrap();
        assert_eq!(s.log_level, LogLevel::Debug);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = Settings::default();
        s.sandbox = true;
        s.extension_dirs = vec![PathBuf::from("/opt/lua-api")];
        s.save(&path).unwrap();
        assert_eq!(Settings::load_from(&path), s);
    }

    #[test]
    fn level_names() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::parse("nope"), None);
    }
}
