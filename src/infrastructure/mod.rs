//! Infrastructure layer: storage backends, cache, I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod cache;
pub mod di;
pub mod error;
pub mod store;
pub mod traits;

pub use cache::ResultCache;
pub use error::{InfraError, InfraResult};
pub use store::{StoreError, StoreResult, TreeStore};
