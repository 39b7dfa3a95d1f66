//! Error types for the grammar registry

use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Registry error types
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The grammar source declares a different scope name than its definition
    #[error(
        "scope name loaded from the grammar source does not match the declared scope name: \
         it should be {actual} instead of {expected}"
    )]
    Configuration { expected: String, actual: String },

    /// A grammar, theme, configuration or catalog source is malformed
    #[error("failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    /// A required source could not be resolved
    #[error("source not found: {0}")]
    NotFound(String),
}

impl RegistryError {
    pub(crate) fn load(path: &str, reason: impl ToString) -> Self {
        RegistryError::Load {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
