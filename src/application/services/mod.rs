//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the storage trait (TreeStore) but are themselves
//! concrete structs, not traits.

mod selection;
mod tree;

pub use selection::{RootHierarchy, SelectionService};
pub use tree::{BuildOutcome, TreeService};
