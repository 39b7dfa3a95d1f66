//! Source document resolution
//!
//! The registry never touches the filesystem itself. Grammar, theme,
//! language configuration and catalog documents are read through a
//! [`FileResolver`] by logical path.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Supplies document text by logical path
pub trait FileResolver: Send + Sync {
    /// Read a document.
    ///
    /// Returns `Ok(None)` when this resolver does not provide `path`.
    fn read(&self, path: &str) -> io::Result<Option<String>>;
}

/// Resolves paths relative to a root directory
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileResolver for FsResolver {
    fn read(&self, path: &str) -> io::Result<Option<String>> {
        let relative = Path::new(path);
        // Only plain relative paths stay inside the root
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Ok(None);
        }

        match std::fs::read_to_string(self.root.join(relative)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// In-memory documents
#[derive(Default, Clone)]
pub struct MemoryResolver {
    files: HashMap<String, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a document
    pub fn with_file(mut self, path: &str, text: &str) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: &str, text: &str) {
        self.files.insert(path.to_string(), text.to_string());
    }
}

impl FileResolver for MemoryResolver {
    fn read(&self, path: &str) -> io::Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }
}

/// Tries resolvers in order; the first that provides a path wins
#[derive(Default, Clone)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn FileResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a resolver (lower precedence than earlier ones)
    pub fn with(mut self, resolver: impl FileResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl FileResolver for ResolverChain {
    fn read(&self, path: &str) -> io::Result<Option<String>> {
        for resolver in &self.resolvers {
            if let Some(text) = resolver.read(path)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}
