//! Randomized root-to-leaf walks and full subtree enumeration.

use rand::Rng;
use tracing::trace;

use crate::domain::arena::TreeArena;
use crate::domain::entities::{FlatPath, PathEntry};
use crate::domain::table::NodeTable;

/// Walk from the parentless node named `entry` down to a leaf.
///
/// At each step the sole child is taken, or one of several children is
/// picked uniformly at random from `rng`. Returns `None` when the table has
/// no matching entry node.
pub fn select_path<R: Rng + ?Sized>(table: &NodeTable, entry: &str, rng: &mut R) -> Option<FlatPath> {
    let start = table.find_entry(entry)?;
    let mut path = vec![PathEntry::from(start)];
    let mut current = start.id;

    loop {
        let children = table.children(current);
        let next = match children.len() {
            0 => break,
            1 => children[0],
            n => children[rng.gen_range(0..n)],
        };
        let Some(node) = table.get(next) else {
            break;
        };
        trace!(from = %current, to = %node.id, choices = children.len(), "descend");
        path.push(PathEntry::from(node));
        current = next;
    }

    Some(path)
}

/// Full subtree of every parentless node, in name order.
///
/// Each item is `(entry name, tree)`. No randomness is involved.
pub fn enumerate(table: &NodeTable) -> Vec<(String, TreeArena)> {
    table
        .top_level()
        .map(|top| (top.name.clone(), TreeArena::from_table(table, top.id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::domain::entities::{Node, NodeId, RootId};

    fn node(id: u64, name: &str, level: u32, parent: Option<u64>) -> Node {
        Node {
            id: NodeId(id),
            name: name.into(),
            kind: format!("k{level}"),
            level,
            root_id: RootId(1),
            parent_id: parent.map(NodeId),
        }
    }

    fn names(path: &FlatPath) -> Vec<&str> {
        path.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn given_chain_when_selecting_then_returns_whole_chain() {
        let table = NodeTable::new(vec![
            node(1, "US", 1, None),
            node(2, "push", 2, Some(1)),
            node(3, "small", 3, Some(2)),
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let path = select_path(&table, "US", &mut rng).unwrap();
            assert_eq!(names(&path), vec!["US", "push", "small"]);
        }
    }

    #[test]
    fn given_unknown_entry_when_selecting_then_none() {
        let table = NodeTable::new(vec![node(1, "US", 1, None)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_path(&table, "DE", &mut rng).is_none());
    }

    #[test]
    fn given_non_top_level_name_when_selecting_then_none() {
        let table = NodeTable::new(vec![node(1, "US", 1, None), node(2, "push", 2, Some(1))]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_path(&table, "push", &mut rng).is_none());
    }

    #[test]
    fn given_leaf_entry_when_selecting_then_single_entry() {
        let table = NodeTable::new(vec![node(1, "US", 1, None)]);
        let mut rng = StdRng::seed_from_u64(1);
        let path = select_path(&table, "US", &mut rng).unwrap();
        assert_eq!(path, vec![PathEntry::new("US", "k1")]);
    }

    #[test]
    fn given_same_seed_when_selecting_then_same_path() {
        let table = NodeTable::new(vec![
            node(1, "US", 1, None),
            node(2, "a", 2, Some(1)),
            node(3, "b", 2, Some(1)),
            node(4, "c", 2, Some(1)),
        ]);
        let first = select_path(&table, "US", &mut StdRng::seed_from_u64(42));
        let second = select_path(&table, "US", &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn given_branching_when_selecting_many_times_then_children_roughly_uniform() {
        let table = NodeTable::new(vec![
            node(1, "US", 1, None),
            node(2, "a", 2, Some(1)),
            node(3, "b", 2, Some(1)),
            node(4, "c", 2, Some(1)),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let trials = 6000;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..trials {
            let path = select_path(&table, "US", &mut rng).unwrap();
            *counts.entry(path[1].name.clone()).or_default() += 1;
        }
        assert_eq!(counts.len(), 3);
        for (name, count) in counts {
            assert!(
                (1700..=2300).contains(&count),
                "child {name} picked {count} times out of {trials}"
            );
        }
    }

    #[test]
    fn given_two_top_level_nodes_when_enumerating_then_one_tree_each_in_name_order() {
        let table = NodeTable::new(vec![
            node(1, "US", 1, None),
            node(2, "push", 2, Some(1)),
            node(3, "DE", 1, None),
        ]);
        let trees = enumerate(&table);
        let entries: Vec<_> = trees.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(entries, vec!["DE", "US"]);
        let total: usize = trees.iter().map(|(_, t)| t.len()).sum();
        assert_eq!(total, table.len());
    }
}
