//! Configuration file support
//!
//! Loads settings from ~/.tmregistry.conf (or %USERPROFILE%\.tmregistry.conf on Windows)
//!
//! Format: simple key=value pairs, one per line
//! Lines starting with # are comments
//!
//! Example:
//! ```text
//! # tmregistry configuration
//! grammar-root = /home/me/.config/tmregistry
//! catalog = grammars/catalog.toml
//! theme = themes/light.json
//! trace-level = debug
//! line-numbers = true
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::syntax::builtin;

/// Configuration settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory searched for grammars, themes and catalogs before the builtins
    pub grammar_root: Option<PathBuf>,
    /// Logical path of the grammar catalog
    pub catalog: String,
    /// Logical path of the theme
    pub theme: String,
    /// `tracing` filter directive
    pub trace_level: Option<String>,
    /// Whether to show line numbers
    pub show_line_numbers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grammar_root: None,
            catalog: builtin::CATALOG.to_string(),
            theme: builtin::DEFAULT_THEME.to_string(),
            trace_level: None,
            show_line_numbers: false,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            std::env::var("USERPROFILE")
                .ok()
                .map(|home| PathBuf::from(home).join(".tmregistry.conf"))
        }

        #[cfg(not(windows))]
        {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".tmregistry.conf"))
        }
    }

    /// Load configuration from the user's config file
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Config::default(),
        }
    }

    /// Load configuration from `path`; a missing file gives the defaults
    pub fn load_from(path: &Path) -> Self {
        let mut config = Config::default();
        if let Ok(contents) = fs::read_to_string(path) {
            let settings = Self::parse(&contents);
            config.apply(&settings);
        }
        config
    }

    /// Parse config file contents into key-value pairs
    fn parse(contents: &str) -> HashMap<String, String> {
        let mut settings = HashMap::new();

        for line in contents.lines() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim().to_string();
                settings.insert(key, value);
            }
        }

        settings
    }

    /// Apply settings from parsed config; invalid values are ignored
    fn apply(&mut self, settings: &HashMap<String, String>) {
        if let Some(value) = non_empty(settings, "grammar-root") {
            self.grammar_root = Some(PathBuf::from(value));
        }

        if let Some(value) = non_empty(settings, "catalog") {
            self.catalog = value.to_string();
        }

        if let Some(value) = non_empty(settings, "theme") {
            self.theme = value.to_string();
        }

        if let Some(value) = non_empty(settings, "trace-level") {
            self.trace_level = Some(value.to_string());
        }

        if let Some(value) = settings.get("line-numbers").and_then(|v| parse_bool(v)) {
            self.show_line_numbers = value;
        }
    }
}

fn non_empty<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

/// Parse a boolean value from string
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
