//! Tree building service
//!
//! Resolves the root, validates a node batch against stored state, and
//! persists it in one store call.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, StoreResultExt};
use crate::domain::{validate_specs, DomainError, Node, NodeSpec, Root, TreeBuilder};
use crate::infrastructure::store::{NodeFilter, StoreError, TreeStore};

/// Output of a build: the root plus the nodes this call created.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub root: Root,
    pub nodes: Vec<Node>,
}

/// Service for adding nodes to named roots.
pub struct TreeService {
    store: Arc<dyn TreeStore>,
}

impl TreeService {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// Add a batch of nodes under `root_name`, creating the root on first use.
    ///
    /// The batch is validated in full before anything is written. A store-level
    /// uniqueness rejection (a concurrent build won) is reported as
    /// [`DomainError::DuplicateName`].
    #[instrument(level = "debug", skip(self, specs), fields(specs = specs.len()))]
    pub fn build(&self, root_name: &str, specs: &[NodeSpec]) -> ApplicationResult<BuildOutcome> {
        let root_name = root_name.trim();
        if root_name.is_empty() {
            return Err(DomainError::InvalidRootName.into());
        }
        let valid = validate_specs(specs)?;

        let root = self.resolve_root(root_name)?;
        if valid.is_empty() {
            return Ok(BuildOutcome {
                root,
                nodes: Vec::new(),
            });
        }

        let existing = self
            .store
            .find_nodes(&NodeFilter::under_root(root.id))
            .with_store_context(format!("load nodes of {}", root.name))?;
        debug!("build: root={} existing={}", root.name, existing.len());

        let drafts = TreeBuilder::new(&existing).plan(&valid)?;
        let nodes = self
            .store
            .create_nodes(root.id, &drafts)
            .map_err(|e| map_insert_error(e, &existing))?;

        info!("built {} nodes under root {}", nodes.len(), root.name);
        Ok(BuildOutcome { root, nodes })
    }

    /// Look up the root, or create it. Losing a create race falls back to a re-read.
    fn resolve_root(&self, name: &str) -> ApplicationResult<Root> {
        if let Some(root) = self
            .store
            .find_root_by_name(name)
            .with_store_context("find root")?
        {
            return Ok(root);
        }

        match self.store.create_root(name) {
            Ok(root) => {
                info!("created root {}", root.name);
                Ok(root)
            }
            Err(StoreError::DuplicateRoot(_)) => self
                .store
                .find_root_by_name(name)
                .with_store_context("find root")?
                .ok_or_else(|| {
                    ApplicationError::storage(
                        format!("root {name} vanished after create conflict"),
                        StoreError::DuplicateRoot(name.to_string()),
                    )
                }),
            Err(e) => Err(ApplicationError::storage("create root", e)),
        }
    }
}

fn map_insert_error(err: StoreError, existing: &[Node]) -> ApplicationError {
    match err {
        StoreError::UniqueViolation {
            name,
            level,
            parent_id,
        } => {
            let parent = parent_id
                .and_then(|id| existing.iter().find(|n| n.id == id))
                .map(|n| n.name.clone());
            DomainError::DuplicateName {
                name,
                level,
                parent,
            }
            .into()
        }
        other => ApplicationError::storage("insert nodes", other),
    }
}
