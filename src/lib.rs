//! tmregistry - grammar and theme registry for editor syntax highlighting
//!
//! A [`GrammarRegistry`] loads grammar documents on demand, assigns
//! scope ids, resolves embedded languages and keeps one active theme
//! shared by every loaded grammar. A [`GrammarCatalog`] maps file names
//! to grammars, and [`HighlightCache`] highlights documents line by line.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tmregistry::syntax::builtin::{BuiltinResolver, CATALOG, DEFAULT_THEME};
//! use tmregistry::{GrammarCatalog, GrammarRegistry, HighlightCache, ThemeModel};
//!
//! # fn main() -> tmregistry::Result<()> {
//! let registry = Arc::new(GrammarRegistry::new(BuiltinResolver));
//! registry.set_theme(&mut ThemeModel::new(DEFAULT_THEME))?;
//!
//! let catalog = GrammarCatalog::load(&BuiltinResolver, CATALOG)?;
//! let entry = catalog.find_by_extension("rs").expect("builtin rust grammar");
//! let grammar = catalog.register(&registry, entry)?;
//!
//! let mut cache = HighlightCache::with_grammar(grammar);
//! let spans = cache.highlight_line(&["fn main() {}"], 0);
//! # let _ = spans;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod highlighter;
pub mod logging;
pub mod registry;
pub mod render;
pub mod syntax;

pub use catalog::{CatalogEntry, GrammarCatalog};
pub use config::Config;
pub use error::{RegistryError, Result};
pub use highlighter::HighlightCache;
pub use registry::{
    FileResolver, FsResolver, GrammarDefinition, GrammarRegistry, LoadedGrammar, MemoryResolver,
    ResolverChain, ScopeId, Subscription, ThemeModel, ThemeRegistry,
};
pub use render::Renderer;
