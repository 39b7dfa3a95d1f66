//! Document format detection and parsing
//!
//! Grammar, theme, language configuration and catalog documents are
//! TOML by default; paths ending in `.json` are parsed as JSON.

use serde::de::DeserializeOwned;

use crate::error::{RegistryError, Result};

/// Serialization format of a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// Pick the format from a logical path
    pub fn from_path(path: &str) -> Self {
        let is_json = path
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Format::Json
        } else {
            Format::Toml
        }
    }
}

/// Parse a document, reporting failures against `path`
pub fn parse<T: DeserializeOwned>(path: &str, text: &str) -> Result<T> {
    match Format::from_path(path) {
        Format::Toml => toml::from_str(text).map_err(|e| RegistryError::load(path, e)),
        Format::Json => serde_json::from_str(text).map_err(|e| RegistryError::load(path, e)),
    }
}
