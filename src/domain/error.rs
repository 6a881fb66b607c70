//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent client-input violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{}", duplicate_message(.name, .level, .parent))]
    DuplicateName {
        name: String,
        level: u32,
        parent: Option<String>,
    },

    #[error("parent module \"{parent}\" for \"{name}\" at level {level} not found")]
    ParentNotFound {
        parent: String,
        name: String,
        level: u32,
    },

    #[error("no matching parameters found for: {}", join_selectors(.selectors))]
    NoMatch { selectors: Vec<String> },

    #[error("invalid node spec #{index}: {message}")]
    InvalidSpec { index: usize, message: String },

    #[error("root name must not be blank")]
    InvalidRootName,
}

fn duplicate_message(name: &str, level: &u32, parent: &Option<String>) -> String {
    match parent {
        Some(p) => format!("module \"{name}\" already exists at level {level} under parent \"{p}\""),
        None => format!("module \"{name}\" already exists at level {level}"),
    }
}

fn join_selectors(selectors: &[String]) -> String {
    selectors.join(", ")
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
