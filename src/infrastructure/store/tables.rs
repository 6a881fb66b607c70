//! Root and node tables shared by all store backends.
//!
//! Every constraint the backends promise is enforced here, before any row is
//! written, so a rejected batch leaves the tables untouched.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::{Node, NodeDraft, NodeId, ParentRef, Root, RootId};
use crate::infrastructure::store::{NodeFilter, ParentFilter, StoreError, StoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeTables {
    next_root_id: u64,
    next_node_id: u64,
    roots: Vec<Root>,
    nodes: Vec<Node>,
}

impl Default for TreeTables {
    fn default() -> Self {
        Self {
            next_root_id: 1,
            next_node_id: 1,
            roots: Vec::new(),
            nodes: Vec::new(),
        }
    }
}

impl TreeTables {
    pub fn find_root_by_name(&self, name: &str) -> Option<Root> {
        self.roots.iter().find(|r| r.name == name).cloned()
    }

    pub fn find_roots_by_names(&self, names: &[String]) -> Vec<Root> {
        self.roots
            .iter()
            .filter(|r| names.contains(&r.name))
            .cloned()
            .collect()
    }

    pub fn list_roots(&self) -> Vec<Root> {
        self.roots.clone()
    }

    pub fn create_root(&mut self, name: &str) -> StoreResult<Root> {
        if self.roots.iter().any(|r| r.name == name) {
            return Err(StoreError::DuplicateRoot(name.to_string()));
        }
        let root = Root {
            id: RootId(self.next_root_id),
            name: name.to_string(),
        };
        self.next_root_id += 1;
        self.roots.push(root.clone());
        Ok(root)
    }

    pub fn find_nodes(&self, filter: &NodeFilter) -> Vec<Node> {
        let mut found: Vec<Node> = self
            .nodes
            .iter()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        found
    }

    /// Insert a batch under `root_id`, all or nothing.
    pub fn create_nodes(&mut self, root_id: RootId, drafts: &[NodeDraft]) -> StoreResult<Vec<Node>> {
        if !self.roots.iter().any(|r| r.id == root_id) {
            return Err(StoreError::MissingRoot(root_id));
        }

        let mut keys: HashSet<(Option<NodeId>, u32, String)> = self
            .nodes
            .iter()
            .filter(|n| n.root_id == root_id)
            .map(|n| (n.parent_id, n.level, n.name.clone()))
            .collect();

        let mut created: Vec<Node> = Vec::with_capacity(drafts.len());
        for (pos, draft) in drafts.iter().enumerate() {
            let missing_parent = || StoreError::MissingParent {
                name: draft.name.clone(),
            };

            let parent_id = match draft.parent {
                ParentRef::None if draft.level == 1 => None,
                ParentRef::None => return Err(missing_parent()),
                _ if draft.level < 2 => return Err(missing_parent()),
                ParentRef::Existing(id) => {
                    let parent = self
                        .nodes
                        .iter()
                        .find(|n| n.id == id)
                        .filter(|n| n.root_id == root_id && n.level + 1 == draft.level)
                        .ok_or_else(missing_parent)?;
                    Some(parent.id)
                }
                ParentRef::Batch(i) => {
                    let parent = created
                        .get(i)
                        .filter(|n| n.level + 1 == draft.level)
                        .ok_or_else(missing_parent)?;
                    Some(parent.id)
                }
            };

            if !keys.insert((parent_id, draft.level, draft.name.clone())) {
                return Err(StoreError::UniqueViolation {
                    name: draft.name.clone(),
                    level: draft.level,
                    parent_id,
                });
            }

            created.push(Node {
                id: NodeId(self.next_node_id + pos as u64),
                name: draft.name.clone(),
                kind: draft.kind.clone(),
                level: draft.level,
                root_id,
                parent_id,
            });
        }

        self.next_node_id += created.len() as u64;
        self.nodes.extend(created.iter().cloned());
        Ok(created)
    }
}

impl NodeFilter {
    fn matches(&self, node: &Node) -> bool {
        if self.root.is_some_and(|r| r != node.root_id) {
            return false;
        }
        if self.level.is_some_and(|l| l != node.level) {
            return false;
        }
        match self.parent {
            ParentFilter::Any => {}
            ParentFilter::Null if node.parent_id.is_some() => return false,
            ParentFilter::Id(id) if node.parent_id != Some(id) => return false,
            _ => {}
        }
        match &self.names {
            Some(names) => names.contains(&node.name),
            None => true,
        }
    }
}
