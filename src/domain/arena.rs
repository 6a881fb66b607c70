use generational_arena::{Arena, Index};
use std::fmt;
use tracing::instrument;

use crate::domain::entities::{FlatPath, NodeId, PathEntry};
use crate::domain::table::NodeTable;

/// Data payload for materialized tree nodes.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub name: String,
    pub kind: String,
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

impl From<&NodeData> for PathEntry {
    fn from(data: &NodeData) -> Self {
        PathEntry::new(data.name.clone(), data.kind.clone())
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for the subtree root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in name order
    pub children: Vec<Index>,
}

/// Arena-based tree holding one fully materialized subtree.
///
/// Uses generational arena for memory-safe node references and O(1) lookups.
/// Each arena represents everything below one level 1 node.
#[derive(Debug)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
    root: Option<Index>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Materialize the full subtree under `top` from a node table.
    ///
    /// Iterative: the stack holds (table id, arena parent) pairs, children are
    /// pushed in reverse so siblings land in name order.
    #[instrument(level = "debug", skip(table))]
    pub fn from_table(table: &NodeTable, top: NodeId) -> Self {
        let mut tree = TreeArena::new();
        let mut stack = vec![(top, None)];

        while let Some((node_id, parent_idx)) = stack.pop() {
            let Some(node) = table.get(node_id) else {
                continue;
            };
            let data = NodeData {
                name: node.name.clone(),
                kind: node.kind.clone(),
            };
            let current_idx = tree.insert_node(data, parent_idx);

            for &child in table.children(node_id).iter().rev() {
                stack.push((child, Some(current_idx)));
            }
        }

        tree
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>) -> Index {
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Pre-order traversal, parents before children.
    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self)
    }

    /// Pre-order `{name, type}` sequence of the whole tree.
    pub fn flatten(&self) -> FlatPath {
        self.iter().map(|(_, node)| PathEntry::from(&node.data)).collect()
    }

    /// Render as a `termtree` for terminal display.
    pub fn to_termtree(&self) -> Option<termtree::Tree<String>> {
        let root = self.root?;
        Some(self.termtree_at(root))
    }

    fn termtree_at(&self, idx: Index) -> termtree::Tree<String> {
        let Some(node) = self.get_node(idx) else {
            return termtree::Tree::new(String::new());
        };
        let leaves = node.children.iter().map(|&c| self.termtree_at(c));
        termtree::Tree::new(node.data.to_string()).with_leaves(leaves)
    }
}

pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}
