//! Grammar catalog
//!
//! A catalog document lists the grammars an application knows about,
//! with their file extensions and embedded languages. It turns a file
//! name into a registered grammar:
//!
//! ```toml
//! [[grammars]]
//! name = "markdown"
//! scope_name = "text.html.markdown"
//! grammar = "grammars/markdown.toml"
//! file_extensions = ["md"]
//!
//! [grammars.embedded_languages]
//! "meta.embedded.block.rust" = "rust"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::document;
use crate::error::{RegistryError, Result};
use crate::registry::{FileResolver, GrammarDefinition, GrammarRegistry, LoadedGrammar};

/// One grammar known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    /// Language name
    pub name: String,
    #[serde(alias = "scopeName")]
    pub scope_name: String,
    /// Logical path of the grammar document
    pub grammar: String,
    #[serde(default, alias = "languageConfiguration")]
    pub language_configuration: Option<String>,
    #[serde(default, alias = "fileExtensions")]
    pub file_extensions: Vec<String>,
    /// Content scope -> language name
    #[serde(default, alias = "embeddedLanguages")]
    pub embedded_languages: BTreeMap<String, String>,
}

impl CatalogEntry {
    /// The registry definition for this entry
    pub fn definition(&self) -> GrammarDefinition {
        let mut definition = GrammarDefinition::new(&self.name, &self.scope_name, &self.grammar)
            .with_embedded_languages(self.embedded_languages.clone());
        if let Some(path) = &self.language_configuration {
            definition = definition.with_language_configuration(path);
        }
        definition
    }

    fn has_extension(&self, ext: &str) -> bool {
        self.file_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    grammars: Vec<CatalogEntry>,
}

/// The grammars an application can load on demand
#[derive(Debug, Clone, Default)]
pub struct GrammarCatalog {
    entries: Vec<CatalogEntry>,
}

impl GrammarCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Parse a catalog document
    pub fn parse(path: &str, text: &str) -> Result<Self> {
        let doc: CatalogDocument = document::parse(path, text)?;
        Ok(Self::new(doc.grammars))
    }

    /// Read and parse the catalog at `path`
    pub fn load(resolver: &dyn FileResolver, path: &str) -> Result<Self> {
        let text = resolver
            .read(path)?
            .ok_or_else(|| RegistryError::NotFound(path.to_string()))?;
        Self::parse(path, &text)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn find_by_name(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn find_by_scope(&self, scope_name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.scope_name == scope_name)
    }

    /// Entry for a file extension, with or without the leading dot
    pub fn find_by_extension(&self, ext: &str) -> Option<&CatalogEntry> {
        let ext = ext.trim_start_matches('.');
        self.entries.iter().find(|e| e.has_extension(ext))
    }

    /// Entry for a file name, by its extension
    pub fn find_for_path(&self, path: &Path) -> Option<&CatalogEntry> {
        let ext = path.extension()?.to_str()?;
        self.find_by_extension(ext)
    }

    /// Allocate scope ids for every entry in catalog order
    pub fn reserve_scope_ids(&self, registry: &GrammarRegistry) {
        let definitions: Vec<_> = self.entries.iter().map(CatalogEntry::definition).collect();
        registry.reserve_scope_ids(&definitions);
    }

    /// Load `entry` into `registry`, embedded languages first
    ///
    /// Embedded languages missing from the catalog, or failing to load,
    /// are skipped with a warning; the host still loads and tokenizes
    /// their content as a single token.
    pub fn register(&self, registry: &GrammarRegistry, entry: &CatalogEntry) -> Result<LoadedGrammar> {
        let mut visiting = HashSet::new();
        self.register_with(registry, entry, &mut visiting)
    }

    fn register_with<'a>(
        &'a self,
        registry: &GrammarRegistry,
        entry: &'a CatalogEntry,
        visiting: &mut HashSet<&'a str>,
    ) -> Result<LoadedGrammar> {
        visiting.insert(entry.name.as_str());

        if !registry.contains_grammar_by_language_name(&entry.name) {
            for language in entry.embedded_languages.values() {
                let Some(embedded) = self.find_by_name(language) else {
                    tracing::warn!(
                        language = language.as_str(),
                        host = entry.name.as_str(),
                        "embedded language not in catalog, skipping"
                    );
                    continue;
                };
                if visiting.contains(embedded.name.as_str())
                    || registry.contains_grammar_by_language_name(&embedded.name)
                {
                    continue;
                }
                if let Err(e) = self.register_with(registry, embedded, visiting) {
                    tracing::warn!(
                        language = embedded.name.as_str(),
                        host = entry.name.as_str(),
                        error = %e,
                        "embedded language failed to load, skipping"
                    );
                }
            }
        }

        registry.load_grammar(&entry.definition())
    }

    /// Register the grammar for a file extension and return its scope name
    ///
    /// Returns `Ok(None)` if no entry claims the extension.
    pub fn scope_for_extension(&self, registry: &GrammarRegistry, ext: &str) -> Result<Option<String>> {
        match self.find_by_extension(ext) {
            Some(entry) => {
                let grammar = self.register(registry, entry)?;
                Ok(Some(grammar.scope_name().to_string()))
            }
            None => Ok(None),
        }
    }
}
