//! Grammar and theme registry
//!
//! [`GrammarRegistry`] lazily loads grammars through a [`FileResolver`],
//! caches them by language name and by scope name, assigns scope ids,
//! and owns the shared tokenizer state: every loaded grammar plus the one
//! active theme. Swapping the theme recolors loaded grammars without
//! reloading them.
//!
//! Mutating operations (loading, theme changes, dispose) are serialized
//! on one operations lock. Their results are published under a
//! read-write lock at the very end, so lookups see either the state
//! before a load or after it, never a partial entry.

mod definition;
mod ids;
mod resolver;
mod theme;

pub use definition::GrammarDefinition;
pub use ids::{ScopeId, ScopeIds};
pub use resolver::{FileResolver, FsResolver, MemoryResolver, ResolverChain};
pub use theme::{Subscription, ThemeModel, ThemeRegistry};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::document;
use crate::error::{RegistryError, Result};
use crate::syntax::{
    Grammar, GrammarLookup, GrammarSource, HighlightResult, LanguageConfiguration, LineState,
    LineTokens, Span, Theme,
};

/// Tokenizer state shared by every grammar loaded into one registry generation
#[derive(Debug, Default)]
pub struct Engine {
    grammars: RwLock<HashMap<String, Arc<Grammar>>>,
    theme: RwLock<Arc<Theme>>,
}

impl Engine {
    /// The active theme
    pub fn theme(&self) -> Arc<Theme> {
        self.theme.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_theme(&self, theme: Arc<Theme>) {
        *self.theme.write().unwrap_or_else(PoisonError::into_inner) = theme;
    }

    fn insert(&self, grammar: Arc<Grammar>) {
        self.grammars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(grammar.scope_name.to_string(), grammar);
    }
}

impl GrammarLookup for Engine {
    fn grammar(&self, scope_name: &str) -> Option<Arc<Grammar>> {
        self.grammars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope_name)
            .cloned()
    }
}

/// A grammar handed out by the registry
///
/// Cloning is cheap; clones share the same compiled grammar.
#[derive(Clone)]
pub struct LoadedGrammar {
    grammar: Arc<Grammar>,
    engine: Arc<Engine>,
}

impl LoadedGrammar {
    pub fn name(&self) -> &str {
        &self.grammar.name
    }

    pub fn scope_name(&self) -> &str {
        &self.grammar.scope_name
    }

    pub fn scope_id(&self) -> ScopeId {
        self.grammar.scope_id
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Whether both handles refer to the same loaded grammar
    pub fn ptr_eq(a: &LoadedGrammar, b: &LoadedGrammar) -> bool {
        Arc::ptr_eq(&a.grammar, &b.grammar)
    }

    /// The theme currently active for this grammar
    pub fn theme(&self) -> Arc<Theme> {
        self.engine.theme()
    }

    /// Tokenize one line given the state the previous line ended in
    pub fn tokenize_line(&self, text: &str, prev_state: &LineState) -> LineTokens {
        self.grammar.tokenize_line(text, prev_state, &*self.engine)
    }

    /// Tokenize one line and style it with the active theme
    pub fn highlight_line(&self, text: &str, prev_state: &LineState) -> HighlightResult {
        let theme = self.engine.theme();
        let tokens = self.tokenize_line(text, prev_state);
        let spans = tokens
            .ranges(text.len())
            .filter(|(range, _)| !range.is_empty())
            .map(|(range, token)| Span::new(range.start, range.end, theme.style_token(token)))
            .collect();
        HighlightResult {
            spans,
            end_state: tokens.end_state,
        }
    }
}

impl std::fmt::Debug for LoadedGrammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedGrammar")
            .field("name", &self.grammar.name)
            .field("scope_name", &self.grammar.scope_name)
            .field("scope_id", &self.grammar.scope_id)
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    engine: Arc<Engine>,
    language_configurations: HashMap<String, Arc<LanguageConfiguration>>,
    scope_ids: ScopeIds,
    /// Language name -> scope name
    language_scopes: HashMap<String, String>,
    /// Scope name -> definition it was loaded from
    definitions: HashMap<String, GrammarDefinition>,
}

impl RegistryState {
    /// Resolve an embedded reference to a scope name
    ///
    /// Known scope names resolve to themselves, registered language names
    /// to their scope name; anything else passes through unchanged.
    fn resolve_scope_name<'a>(&'a self, name: &'a str) -> &'a str {
        if self.definitions.contains_key(name) {
            return name;
        }
        self.language_scopes.get(name).map_or(name, String::as_str)
    }

    fn loaded(&self, scope_name: &str) -> Option<LoadedGrammar> {
        self.engine.grammar(scope_name).map(|grammar| LoadedGrammar {
            grammar,
            engine: Arc::clone(&self.engine),
        })
    }
}

/// Cache of loaded grammars, language configurations and the active theme
///
/// Construct one per process (or per editor session) and share it
/// through an `Arc`.
pub struct GrammarRegistry {
    resolver: Arc<dyn FileResolver>,
    ops: Mutex<()>,
    state: RwLock<RegistryState>,
}

impl GrammarRegistry {
    /// Create an empty registry reading sources through `resolver`
    pub fn new(resolver: impl FileResolver + 'static) -> Self {
        Self::with_resolver(Arc::new(resolver))
    }

    pub fn with_resolver(resolver: Arc<dyn FileResolver>) -> Self {
        Self {
            resolver,
            ops: Mutex::new(()),
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn resolver(&self) -> &Arc<dyn FileResolver> {
        &self.resolver
    }

    fn lock_ops(&self) -> MutexGuard<'_, ()> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a grammar, or return the cached one for its language name
    ///
    /// Loads the language configuration first when the definition names
    /// one the resolver can provide.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Configuration`] if the grammar source declares a
    ///   different scope name than the definition
    /// - [`RegistryError::NotFound`] if the grammar source cannot be resolved
    /// - [`RegistryError::Load`] if a source is malformed
    ///
    /// On error the registry is left unchanged.
    pub fn load_grammar(&self, definition: &GrammarDefinition) -> Result<LoadedGrammar> {
        let _ops = self.lock_ops();

        {
            let state = self.read_state();
            if let Some(scope_name) = state.language_scopes.get(definition.name()) {
                if let Some(loaded) = state.loaded(scope_name) {
                    tracing::debug!(language = definition.name(), "grammar cache hit");
                    return Ok(loaded);
                }
            }
        }

        if let Some(loaded) = self.alias_loaded_scope(definition)? {
            return Ok(loaded);
        }

        self.do_load_grammar(definition)
    }

    /// A second language name for an already loaded scope shares its grammar
    ///
    /// The alias must name the same grammar source the scope was loaded from.
    fn alias_loaded_scope(&self, definition: &GrammarDefinition) -> Result<Option<LoadedGrammar>> {
        let mut state = self.write_state();
        let Some(loaded) = state.loaded(definition.scope_name()) else {
            return Ok(None);
        };
        if let Some(existing) = state.definitions.get(definition.scope_name()) {
            if existing.grammar() != definition.grammar() {
                return Err(RegistryError::load(
                    definition.grammar(),
                    format!(
                        "scope {} is already loaded from {}",
                        definition.scope_name(),
                        existing.grammar()
                    ),
                ));
            }
        }
        tracing::info!(
            language = definition.name(),
            scope = definition.scope_name(),
            "scope already loaded under another language name"
        );
        state
            .language_scopes
            .insert(definition.name().to_string(), definition.scope_name().to_string());
        Ok(Some(loaded))
    }

    fn do_load_grammar(&self, definition: &GrammarDefinition) -> Result<LoadedGrammar> {
        let configuration = match definition.language_configuration() {
            Some(path) => self.read_language_configuration(path)?,
            None => None,
        };

        let path = definition.grammar();
        let text = self
            .resolver
            .read(path)?
            .ok_or_else(|| RegistryError::NotFound(path.to_string()))?;
        let source: GrammarSource = document::parse(path, &text)?;

        if source.scope_name != definition.scope_name() {
            tracing::warn!(
                path,
                declared = definition.scope_name(),
                actual = %source.scope_name,
                "grammar scope name mismatch"
            );
            return Err(RegistryError::Configuration {
                expected: definition.scope_name().to_string(),
                actual: source.scope_name,
            });
        }

        // Ids are allocated on a copy and only published with the grammar
        let (grammar, scope_ids) = {
            let state = self.read_state();
            let mut scope_ids = state.scope_ids.clone();
            let scope_id = scope_ids.get_or_pull(definition.scope_name());

            let resolve = |reference: &str| -> String {
                if reference == definition.name() {
                    definition.scope_name().to_string()
                } else {
                    state.resolve_scope_name(reference).to_string()
                }
            };

            let mut embedded_ids = HashMap::new();
            for (content_scope, language) in definition.embedded_languages() {
                let id = scope_ids.get_or_pull(&resolve(language));
                embedded_ids.insert(content_scope.clone(), id);
            }

            let grammar = Grammar::compile(path, source, scope_id, &resolve, &embedded_ids)?;
            (Arc::new(grammar), scope_ids)
        };

        let mut state = self.write_state();
        state.scope_ids = scope_ids;
        if let Some(configuration) = configuration {
            state
                .language_configurations
                .insert(definition.scope_name().to_string(), Arc::new(configuration));
        }
        state
            .language_scopes
            .insert(definition.name().to_string(), definition.scope_name().to_string());
        state
            .definitions
            .insert(definition.scope_name().to_string(), definition.clone());
        state.engine.insert(Arc::clone(&grammar));

        tracing::debug!(
            language = definition.name(),
            scope = definition.scope_name(),
            id = %grammar.scope_id,
            "loaded grammar"
        );

        Ok(LoadedGrammar {
            grammar,
            engine: Arc::clone(&state.engine),
        })
    }

    fn read_language_configuration(&self, path: &str) -> Result<Option<LanguageConfiguration>> {
        match self.resolver.read(path)? {
            Some(text) => Ok(Some(LanguageConfiguration::parse(path, &text)?)),
            None => {
                tracing::warn!(path, "language configuration not found, skipping");
                Ok(None)
            }
        }
    }

    /// Load a grammar and look up its language configuration
    pub fn load_grammar_and_configuration(
        &self,
        definition: &GrammarDefinition,
    ) -> Result<(LoadedGrammar, Option<Arc<LanguageConfiguration>>)> {
        let grammar = self.load_grammar(definition)?;
        let configuration = self.find_language_configuration(grammar.scope_name());
        Ok((grammar, configuration))
    }

    /// Loaded grammar for a scope name, without loading anything
    pub fn find_grammar(&self, scope_name: &str) -> Option<LoadedGrammar> {
        self.read_state().loaded(scope_name)
    }

    /// Language configuration registered for a scope name
    pub fn find_language_configuration(&self, scope_name: &str) -> Option<Arc<LanguageConfiguration>> {
        self.read_state().language_configurations.get(scope_name).cloned()
    }

    /// Register a language configuration the caller loaded itself
    pub fn set_language_configuration(&self, scope_name: &str, configuration: LanguageConfiguration) {
        let _ops = self.lock_ops();
        self.write_state()
            .language_configurations
            .insert(scope_name.to_string(), Arc::new(configuration));
    }

    /// Whether a grammar was loaded under this language name
    pub fn contains_grammar_by_language_name(&self, name: &str) -> bool {
        self.read_state().language_scopes.contains_key(name)
    }

    /// Id allocated for a scope name
    pub fn scope_id(&self, scope_name: &str) -> Option<ScopeId> {
        self.read_state().scope_ids.get(scope_name)
    }

    /// Id an embedded-language reference resolves to
    ///
    /// The reference may be a scope name or a registered language name.
    pub fn resolve_scope_id(&self, reference: &str) -> Option<ScopeId> {
        let state = self.read_state();
        state.scope_ids.get(state.resolve_scope_name(reference))
    }

    /// Allocate ids for grammars that will be loaded later
    pub fn reserve_scope_ids(&self, definitions: &[GrammarDefinition]) {
        let _ops = self.lock_ops();
        let mut state = self.write_state();
        for definition in definitions {
            state.scope_ids.get_or_pull(definition.scope_name());
        }
    }

    /// Names of the loaded languages, sorted
    pub fn loaded_languages(&self) -> Vec<String> {
        let mut names: Vec<_> = self.read_state().language_scopes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Load `model` if needed and make it the active theme
    ///
    /// Every loaded grammar picks the theme up on its next highlight.
    /// On error the previous theme stays active.
    pub fn set_theme(&self, model: &mut ThemeModel) -> Result<()> {
        let _ops = self.lock_ops();
        let theme = model.load(&*self.resolver)?;
        tracing::info!(theme = %theme.name, "applying theme");
        self.read_state().engine.set_theme(theme);
        Ok(())
    }

    /// The active theme
    pub fn current_theme(&self) -> Arc<Theme> {
        self.read_state().engine.theme()
    }

    /// Follow theme changes published on `themes`
    ///
    /// Applies the current theme of `themes`, if any, right away.
    /// The registry stays subscribed until the returned handle is dropped.
    pub fn attach(self: &Arc<Self>, themes: &ThemeRegistry) -> Result<Subscription> {
        let registry = Arc::downgrade(self);
        let subscription = themes.subscribe(move |model| match registry.upgrade() {
            Some(registry) => registry.set_theme(model),
            None => Ok(()),
        });
        if let Some(mut current) = themes.current() {
            self.set_theme(&mut current)?;
        }
        Ok(subscription)
    }

    /// Drop every cached grammar, configuration and scope id
    ///
    /// Grammars handed out earlier keep working against the discarded
    /// state but are no longer reachable through the registry.
    pub fn dispose(&self) {
        let _ops = self.lock_ops();
        *self.write_state() = RegistryState::default();
        tracing::info!("grammar registry disposed");
    }
}
