//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod selector;
pub mod table;

pub use arena::{NodeData, TreeArena, TreeNode};
pub use builder::{validate_specs, TreeBuilder, ValidSpec};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use selector::{enumerate, select_path};
pub use table::NodeTable;
