//! Batch validation for node inserts.
//!
//! Turns caller specs into [`NodeDraft`]s after checking every naming and
//! parent rule against the nodes already stored under the root. Nothing here
//! touches storage; the whole batch is either accepted or rejected.

use std::collections::{HashMap, HashSet};

use tracing::{instrument, trace};

use crate::domain::entities::{Node, NodeDraft, NodeId, NodeSpec, ParentRef};
use crate::domain::error::{DomainError, DomainResult};

/// A spec with defaults applied and required fields checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSpec {
    pub name: String,
    pub kind: String,
    pub level: u32,
    /// Always `Some` for level > 1
    pub parent_name: Option<String>,
}

/// Check required fields and apply defaults.
///
/// `name` is mandatory; `level` defaults to 1 unless `parentName` is given.
/// Above level 1 both `type` and `parentName` must be present. A level 1
/// spec ignores `parentName`.
pub fn validate_specs(specs: &[NodeSpec]) -> DomainResult<Vec<ValidSpec>> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| validate_spec(index, spec))
        .collect()
}

fn validate_spec(index: usize, spec: &NodeSpec) -> DomainResult<ValidSpec> {
    let invalid = |message: &str| DomainError::InvalidSpec {
        index,
        message: message.to_string(),
    };

    let name = spec.name.trim();
    if name.is_empty() {
        return Err(invalid("name is required"));
    }

    let kind = spec.kind.as_deref().map(str::trim).filter(|k| !k.is_empty());
    let parent = spec
        .parent_name
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let level = match (spec.level, parent) {
        (Some(level), _) => level,
        (None, None) => 1,
        (None, Some(_)) => return Err(invalid("level is required when parentName is given")),
    };
    if level == 0 {
        return Err(invalid("level must be a positive integer"));
    }

    if level == 1 {
        return Ok(ValidSpec {
            name: name.to_string(),
            kind: kind.unwrap_or_default().to_string(),
            level,
            parent_name: None,
        });
    }

    let kind = kind.ok_or_else(|| invalid("type is required above level 1"))?;
    let parent = parent.ok_or_else(|| invalid("parentName is required above level 1"))?;

    Ok(ValidSpec {
        name: name.to_string(),
        kind: kind.to_string(),
        level,
        parent_name: Some(parent.to_string()),
    })
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Existing(NodeId),
    Batch(usize),
}

impl From<Slot> for ParentRef {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Existing(id) => ParentRef::Existing(id),
            Slot::Batch(pos) => ParentRef::Batch(pos),
        }
    }
}

/// Plans a batch insert under one root.
///
/// Seeded with the root's stored nodes; every planned node is added to the
/// lookup so later specs in the same batch can use it as parent.
pub struct TreeBuilder {
    by_name_level: HashMap<(String, u32), Slot>,
    top_level: HashSet<String>,
    /// (parent, level, name) of stored nodes
    siblings: HashSet<(NodeId, u32, String)>,
}

impl TreeBuilder {
    pub fn new(existing: &[Node]) -> Self {
        let mut by_name_level = HashMap::with_capacity(existing.len());
        let mut top_level = HashSet::new();
        let mut siblings = HashSet::new();

        for node in existing {
            by_name_level.insert((node.name.clone(), node.level), Slot::Existing(node.id));
            match node.parent_id {
                None if node.level == 1 => {
                    top_level.insert(node.name.clone());
                }
                Some(parent) => {
                    siblings.insert((parent, node.level, node.name.clone()));
                }
                None => {}
            }
        }

        Self {
            by_name_level,
            top_level,
            siblings,
        }
    }

    /// Validate the batch in input order and return drafts ready for storage.
    #[instrument(level = "debug", skip_all, fields(specs = specs.len()))]
    pub fn plan(mut self, specs: &[ValidSpec]) -> DomainResult<Vec<NodeDraft>> {
        let mut drafts = Vec::with_capacity(specs.len());

        for spec in specs {
            let duplicate = |parent: Option<&String>| DomainError::DuplicateName {
                name: spec.name.clone(),
                level: spec.level,
                parent: parent.cloned(),
            };

            if spec.level == 1 && !self.top_level.insert(spec.name.clone()) {
                return Err(duplicate(None));
            }

            let key = (spec.name.clone(), spec.level);
            if self.by_name_level.contains_key(&key) {
                return Err(duplicate(spec.parent_name.as_ref()));
            }

            let parent = match &spec.parent_name {
                None => ParentRef::None,
                Some(parent_name) => {
                    let slot = self
                        .by_name_level
                        .get(&(parent_name.clone(), spec.level - 1))
                        .copied()
                        .ok_or_else(|| DomainError::ParentNotFound {
                            parent: parent_name.clone(),
                            name: spec.name.clone(),
                            level: spec.level,
                        })?;
                    if let Slot::Existing(parent_id) = slot {
                        if self
                            .siblings
                            .contains(&(parent_id, spec.level, spec.name.clone()))
                        {
                            return Err(duplicate(Some(parent_name)));
                        }
                    }
                    slot.into()
                }
            };

            trace!(name = %spec.name, level = spec.level, ?parent, "planned node");
            self.by_name_level.insert(key, Slot::Batch(drafts.len()));
            drafts.push(NodeDraft {
                name: spec.name.clone(),
                kind: spec.kind.clone(),
                level: spec.level,
                parent,
            });
        }

        Ok(drafts)
    }
}
