//! Error types for the knowledge store.

use thiserror::Error;

/// Result type alias for knowledge operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;

/// Errors that can occur while loading or persisting knowledge.
///
/// None of these escape [`crate::KnowledgeStore::search`] or
/// [`crate::KnowledgeStore::learn`]; they are logged and the store carries on
/// with whatever it holds in memory.
#[derive(Error, Debug)]
pub enum KnowledgeError {
    /// Failed to read a knowledge file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the overlay file.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
