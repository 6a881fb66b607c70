//! Storage-level errors

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{NodeId, RootId};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt store file {}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("root \"{0}\" already exists")]
    DuplicateRoot(String),

    /// Composite key (root, parent, level, name) already taken
    #[error("unique constraint violated: \"{name}\" at level {level}")]
    UniqueViolation {
        name: String,
        level: u32,
        parent_id: Option<NodeId>,
    },

    #[error("node \"{name}\" references missing or misplaced parent")]
    MissingParent { name: String },

    #[error("root {0} does not exist")]
    MissingRoot(RootId),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
