//! Selection service
//!
//! Composes root lookup, randomized path walks, the result cache, and the
//! full hierarchy export.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::application::{ApplicationResult, StoreResultExt};
use crate::domain::{
    enumerate, select_path, DomainError, EnumeratedGroup, Enumeration, NodeTable, Root, Selection,
    TreeArena,
};
use crate::infrastructure::cache::ResultCache;
use crate::infrastructure::store::{NodeFilter, TreeStore};

/// Every materialized subtree of one root.
#[derive(Debug)]
pub struct RootHierarchy {
    pub root: Root,
    /// (entry name, subtree) per level 1 node, in name order
    pub trees: Vec<(String, TreeArena)>,
}

/// Service answering selector queries and full exports.
pub struct SelectionService {
    store: Arc<dyn TreeStore>,
    cache: Option<Arc<ResultCache<Selection>>>,
    rng: Mutex<StdRng>,
}

impl SelectionService {
    /// `cache: None` disables memoization; `seed` pins the random source.
    pub fn new(
        store: Arc<dyn TreeStore>,
        cache: Option<Arc<ResultCache<Selection>>>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(store, cache, rng)
    }

    pub fn with_rng(
        store: Arc<dyn TreeStore>,
        cache: Option<Arc<ResultCache<Selection>>>,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            cache,
            rng: Mutex::new(rng),
        }
    }

    /// Walk each selected root from its entry node down to a leaf.
    ///
    /// Roots named in `selectors` that do not exist are ignored; roots without
    /// the requested entry node contribute no group. Fails with
    /// [`DomainError::NoMatch`] only when no root resolves at all.
    #[instrument(level = "debug", skip(self))]
    pub fn generate_selection(
        &self,
        selectors: &BTreeMap<String, String>,
    ) -> ApplicationResult<Selection> {
        let key = ResultCache::<Selection>::selector_key(selectors);
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            debug!("cache hit: {}", key);
            return Ok(cached);
        }

        let names: Vec<String> = selectors.keys().cloned().collect();
        let roots = self
            .store
            .find_roots_by_names(&names)
            .with_store_context("find roots")?;
        if roots.is_empty() {
            return Err(DomainError::NoMatch { selectors: names }.into());
        }

        let tables = roots
            .into_iter()
            .map(|root| self.load_table(&root).map(|table| (root, table)))
            .collect::<ApplicationResult<Vec<_>>>()?;

        let mut rng = self.rng();
        let mut groups = Vec::with_capacity(tables.len());
        for (root, table) in &tables {
            let Some(entry) = selectors.get(&root.name) else {
                continue;
            };
            match select_path(table, entry, &mut *rng) {
                Some(path) => groups.push(path),
                None => debug!("no entry node {} in root {}", entry, root.name),
            }
        }
        let selection = Selection {
            selection_id: new_selection_id(&mut *rng),
            groups,
        };
        drop(rng);

        if let Some(cache) = &self.cache {
            cache.set(key, selection.clone());
        }
        info!(
            "selection {} with {} groups",
            selection.selection_id,
            selection.groups.len()
        );
        Ok(selection)
    }

    /// Full subtree of every level 1 node of every root, flattened in pre-order.
    ///
    /// An empty store yields an empty result, not an error.
    #[instrument(level = "debug", skip(self))]
    pub fn enumerate_all(&self) -> ApplicationResult<Enumeration> {
        let groups = self
            .hierarchy()?
            .into_iter()
            .flat_map(|h| {
                let root = h.root.name;
                h.trees.into_iter().map(move |(entry, tree)| EnumeratedGroup {
                    root: root.clone(),
                    entry,
                    path: tree.flatten(),
                })
            })
            .collect();

        Ok(Enumeration {
            selection_id: new_selection_id(&mut *self.rng()),
            groups,
        })
    }

    /// Materialized trees per root; roots without level 1 nodes are skipped.
    pub fn hierarchy(&self) -> ApplicationResult<Vec<RootHierarchy>> {
        let roots = self.store.list_roots().with_store_context("list roots")?;
        let mut result = Vec::with_capacity(roots.len());
        for root in roots {
            let table = self.load_table(&root)?;
            let trees = enumerate(&table);
            if trees.is_empty() {
                debug!("no top level nodes in root {}", root.name);
                continue;
            }
            result.push(RootHierarchy { root, trees });
        }
        Ok(result)
    }

    fn load_table(&self, root: &Root) -> ApplicationResult<NodeTable> {
        let nodes = self
            .store
            .find_nodes(&NodeFilter::under_root(root.id))
            .with_store_context(format!("load nodes of {}", root.name))?;
        Ok(NodeTable::new(nodes))
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        // Generator state stays valid even if a holder panicked
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Random v4 UUID drawn from the injected generator.
fn new_selection_id<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}
