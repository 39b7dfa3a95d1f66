//! Grammar definitions

use std::collections::BTreeMap;

/// Identifies a language and where its grammar comes from
///
/// Paths are logical paths handed to the registry's
/// [`FileResolver`](super::FileResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarDefinition {
    name: String,
    scope_name: String,
    grammar: String,
    language_configuration: Option<String>,
    embedded_languages: BTreeMap<String, String>,
}

impl GrammarDefinition {
    pub fn new(name: &str, scope_name: &str, grammar: &str) -> Self {
        Self {
            name: name.to_string(),
            scope_name: scope_name.to_string(),
            grammar: grammar.to_string(),
            language_configuration: None,
            embedded_languages: BTreeMap::new(),
        }
    }

    /// Builder: path of the language configuration document
    pub fn with_language_configuration(mut self, path: &str) -> Self {
        self.language_configuration = Some(path.to_string());
        self
    }

    /// Builder: embedded scope name to language name mapping
    pub fn with_embedded_languages<I, K, V>(mut self, embedded: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.embedded_languages = embedded
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Language name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scope name the grammar source must declare
    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    /// Path of the grammar source
    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    pub fn language_configuration(&self) -> Option<&str> {
        self.language_configuration.as_deref()
    }

    pub fn embedded_languages(&self) -> &BTreeMap<String, String> {
        &self.embedded_languages
    }
}
