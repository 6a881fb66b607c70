//! Persistent storage of roots and their node trees.
//!
//! Services only see the [`TreeStore`] trait; backends are picked at startup
//! from [`crate::config::StoreBackend`].

mod error;
mod file;
mod memory;
mod tables;

pub use error::{StoreError, StoreResult};
pub use file::FileTreeStore;
pub use memory::MemoryTreeStore;
pub use tables::TreeTables;

use crate::domain::{Node, NodeDraft, NodeId, Root, RootId};

/// Constraint on a node's parent column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentFilter {
    #[default]
    Any,
    /// Parent is null
    Null,
    Id(NodeId),
}

/// Node query. Empty fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub root: Option<RootId>,
    pub parent: ParentFilter,
    pub level: Option<u32>,
    pub names: Option<Vec<String>>,
}

impl NodeFilter {
    pub fn under_root(root: RootId) -> Self {
        Self {
            root: Some(root),
            ..Default::default()
        }
    }

    pub fn parentless(mut self) -> Self {
        self.parent = ParentFilter::Null;
        self
    }

    pub fn child_of(mut self, parent: NodeId) -> Self {
        self.parent = ParentFilter::Id(parent);
        self
    }

    pub fn at_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn named<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

/// Storage contract for roots and nodes.
///
/// Reads reflect every prior write through the same store (read-your-writes).
/// `create_nodes` enforces uniqueness of (root, parent, level, name) and
/// parent integrity for the whole batch before writing any of it.
pub trait TreeStore: Send + Sync {
    fn find_root_by_name(&self, name: &str) -> StoreResult<Option<Root>>;

    /// Roots whose name is in `names`, ordered by id.
    fn find_roots_by_names(&self, names: &[String]) -> StoreResult<Vec<Root>>;

    /// All roots, ordered by id.
    fn list_roots(&self) -> StoreResult<Vec<Root>>;

    /// Fails with [`StoreError::DuplicateRoot`] if the name is taken.
    fn create_root(&self, name: &str) -> StoreResult<Root>;

    /// Matching nodes ordered by name, then id.
    fn find_nodes(&self, filter: &NodeFilter) -> StoreResult<Vec<Node>>;

    /// Insert a batch under `root`; drafts may reference earlier drafts as parents.
    fn create_nodes(&self, root: RootId, drafts: &[NodeDraft]) -> StoreResult<Vec<Node>>;
}
