//! In-memory index over all nodes of one root.
//!
//! Loaded once per root so walks and enumeration never go back to storage
//! per level.

use std::collections::HashMap;

use itertools::Itertools;

use crate::domain::entities::{Node, NodeId};

#[derive(Debug, Default)]
pub struct NodeTable {
    nodes: HashMap<NodeId, Node>,
    /// Children per parent (`None` = parentless), ordered by name then id
    children: HashMap<Option<NodeId>, Vec<NodeId>>,
}

impl NodeTable {
    pub fn new(nodes: Vec<Node>) -> Self {
        let children = nodes
            .iter()
            .sorted_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)))
            .map(|n| (n.parent_id, n.id))
            .into_group_map();
        let nodes = nodes.into_iter().map(|n| (n.id, n)).collect();
        Self { nodes, children }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of `id`, ordered by name.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&Some(id)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parentless nodes, ordered by name.
    pub fn top_level(&self) -> impl Iterator<Item = &Node> {
        self.children
            .get(&None)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
    }

    /// Parentless node named `name`.
    ///
    /// Should more than one exist, the deepest level wins, then the lowest id.
    pub fn find_entry(&self, name: &str) -> Option<&Node> {
        self.top_level()
            .filter(|n| n.name == name)
            .min_by(|a, b| b.level.cmp(&a.level).then(a.id.cmp(&b.id)))
    }
}
