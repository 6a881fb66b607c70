use std::sync::{Mutex, MutexGuard};

use crate::domain::{Node, NodeDraft, Root, RootId};
use crate::infrastructure::store::{NodeFilter, StoreError, StoreResult, TreeStore, TreeTables};

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryTreeStore {
    tables: Mutex<TreeTables>,
}

impl MemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, TreeTables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl TreeStore for MemoryTreeStore {
    fn find_root_by_name(&self, name: &str) -> StoreResult<Option<Root>> {
        Ok(self.lock()?.find_root_by_name(name))
    }

    fn find_roots_by_names(&self, names: &[String]) -> StoreResult<Vec<Root>> {
        Ok(self.lock()?.find_roots_by_names(names))
    }

    fn list_roots(&self) -> StoreResult<Vec<Root>> {
        Ok(self.lock()?.list_roots())
    }

    fn create_root(&self, name: &str) -> StoreResult<Root> {
        self.lock()?.create_root(name)
    }

    fn find_nodes(&self, filter: &NodeFilter) -> StoreResult<Vec<Node>> {
        Ok(self.lock()?.find_nodes(filter))
    }

    fn create_nodes(&self, root: RootId, drafts: &[NodeDraft]) -> StoreResult<Vec<Node>> {
        self.lock()?.create_nodes(root, drafts)
    }
}
