//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{SelectionService, TreeService};
use crate::config::{Settings, StoreBackend};
use crate::domain::Selection;
use crate::infrastructure::cache::ResultCache;
use crate::infrastructure::store::{FileTreeStore, MemoryTreeStore, TreeStore};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
///
/// Built once at startup from explicit settings; nothing is global.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Tree storage backend
    pub store: Arc<dyn TreeStore>,

    /// Selection result cache, absent when disabled
    pub cache: Option<Arc<ResultCache<Selection>>>,

    pub trees: TreeService,
    pub selections: SelectionService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let store: Arc<dyn TreeStore> = match settings.store.backend {
            StoreBackend::Memory => Arc::new(MemoryTreeStore::new()),
            StoreBackend::File => {
                let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
                Arc::new(FileTreeStore::new(settings.store.path.clone(), fs))
            }
        };
        debug!("store backend: {:?}", settings.store.backend);
        Self::with_deps(settings, store)
    }

    /// Create a service container with a custom store (for testing).
    pub fn with_deps(settings: Settings, store: Arc<dyn TreeStore>) -> Self {
        let settings = Arc::new(settings);
        let cache = settings
            .cache
            .enabled
            .then(|| Arc::new(ResultCache::new(settings.cache.ttl_secs)));

        let trees = TreeService::new(store.clone());
        let selections =
            SelectionService::new(store.clone(), cache.clone(), settings.selection.seed);

        Self {
            settings,
            store,
            cache,
            trees,
            selections,
        }
    }
}
