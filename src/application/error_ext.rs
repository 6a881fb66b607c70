//! Error conversion helpers for store calls
//!
//! Provides an extension trait for attaching operation context to store errors.

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::StoreResult;

/// Extension trait for converting `StoreResult` to `ApplicationResult` with context.
pub trait StoreResultExt<T> {
    /// Add context to a storage error.
    ///
    /// # Example
    /// ```ignore
    /// store.list_roots().with_store_context("list roots")?;
    /// ```
    fn with_store_context(self, action: impl Into<String>) -> ApplicationResult<T>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn with_store_context(self, action: impl Into<String>) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::storage(action, e))
    }
}
