//! Error types for the persistence layer
//!
//! None of these reach the host: the gateway logs them and collapses them to
//! `None` or a no-op. They exist so each step can be written with `?`.

use thiserror::Error;

/// Failure reported by a key-value backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage backend unavailable")]
    Unavailable,
    #[error("storage quota exceeded: {needed} bytes needed (capacity {capacity})")]
    QuotaExceeded { needed: usize, capacity: usize },
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Where in the stored document a structural check failed, and why
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: expected {expected}")]
pub struct ShapeError {
    pub path: String,
    pub expected: &'static str,
}

impl ShapeError {
    pub fn new(path: impl Into<String>, expected: &'static str) -> Self {
        Self {
            path: path.into(),
            expected,
        }
    }
}

/// Reasons a stored record is treated as absent
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored value is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("stored value is not a JSON object")]
    NotARecord,
    #[error("schema tag present but not a string")]
    SchemaNotString,
    #[error("version missing or not a number")]
    MissingVersion,
    #[error("schema mismatch: found {found:?}")]
    SchemaMismatch { found: String },
    #[error("version mismatch: found {found}")]
    VersionMismatch { found: f64 },
    #[error("invalid state shape: {0}")]
    Shape(#[from] ShapeError),
}

/// Reasons a flush did not land in the store
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
