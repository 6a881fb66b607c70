//! JSON file backend.
//!
//! The whole table set lives in one file. Every call reloads it, so separate
//! processes sharing the file see each other's committed writes; a write is
//! a full atomic replace of the file.
//!
//! A sibling `<file>.lock` carries an OS file lock: shared for reads,
//! exclusive for load-modify-save, so concurrent writers never work from the
//! same snapshot.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fs2::FileExt;
use tracing::{debug, instrument, trace};

use crate::domain::{Node, NodeDraft, Root, RootId};
use crate::infrastructure::store::{NodeFilter, StoreError, StoreResult, TreeStore, TreeTables};
use crate::infrastructure::traits::FileSystem;

pub struct FileTreeStore {
    path: PathBuf,
    lock_path: PathBuf,
    fs: Arc<dyn FileSystem>,
    /// Serializes load-modify-save between threads sharing this instance
    write_lock: Mutex<()>,
}

#[derive(Clone, Copy, Debug)]
enum LockMode {
    Shared,
    Exclusive,
}

impl FileTreeStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().unwrap_or_default().to_os_string();
        lock_name.push(".lock");
        Self {
            lock_path: path.with_file_name(lock_name),
            path,
            fs,
            write_lock: Mutex::new(()),
        }
    }

    /// Open the lock file and block until the OS lock is held.
    /// Released when the returned handle is dropped.
    fn lock_file(&self, mode: LockMode) -> StoreResult<File> {
        let context = || format!("lock {}", self.lock_path.display());
        self.fs
            .ensure_parent(&self.lock_path)
            .map_err(|e| StoreError::io(context(), e))?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| StoreError::io(context(), e))?;
        let locked = match mode {
            LockMode::Shared => FileExt::lock_shared(&file),
            LockMode::Exclusive => FileExt::lock_exclusive(&file),
        };
        locked.map_err(|e| StoreError::io(context(), e))?;
        trace!(?mode, "acquired {}", self.lock_path.display());
        Ok(file)
    }

    /// Snapshot under a shared lock.
    fn read(&self) -> StoreResult<TreeTables> {
        let _lock = self.lock_file(LockMode::Shared)?;
        self.load()
    }

    fn load(&self) -> StoreResult<TreeTables> {
        if !self.fs.exists(&self.path) {
            return Ok(TreeTables::default());
        }
        let content = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| StoreError::io(format!("read {}", self.path.display()), e))?;
        if content.trim().is_empty() {
            return Ok(TreeTables::default());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Serialization {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, tables: &TreeTables) -> StoreResult<()> {
        let content =
            serde_json::to_string_pretty(tables).map_err(|source| StoreError::Serialization {
                path: self.path.clone(),
                source,
            })?;
        self.fs
            .write_atomic(&self.path, &content)
            .map_err(|e| StoreError::io(format!("write {}", self.path.display()), e))
    }

    /// Load, apply `op`, and save only if `op` succeeded, all under the
    /// exclusive lock.
    fn modify<T>(&self, op: impl FnOnce(&mut TreeTables) -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let _lock = self.lock_file(LockMode::Exclusive)?;
        let mut tables = self.load()?;
        let value = op(&mut tables)?;
        self.save(&tables)?;
        Ok(value)
    }
}

impl TreeStore for FileTreeStore {
    fn find_root_by_name(&self, name: &str) -> StoreResult<Option<Root>> {
        Ok(self.read()?.find_root_by_name(name))
    }

    fn find_roots_by_names(&self, names: &[String]) -> StoreResult<Vec<Root>> {
        Ok(self.read()?.find_roots_by_names(names))
    }

    fn list_roots(&self) -> StoreResult<Vec<Root>> {
        Ok(self.read()?.list_roots())
    }

    #[instrument(level = "debug", skip(self))]
    fn create_root(&self, name: &str) -> StoreResult<Root> {
        self.modify(|tables| tables.create_root(name))
    }

    fn find_nodes(&self, filter: &NodeFilter) -> StoreResult<Vec<Node>> {
        Ok(self.read()?.find_nodes(filter))
    }

    #[instrument(level = "debug", skip(self, drafts), fields(count = drafts.len()))]
    fn create_nodes(&self, root: RootId, drafts: &[NodeDraft]) -> StoreResult<Vec<Node>> {
        let created = self.modify(|tables| tables.create_nodes(root, drafts))?;
        debug!("persisted {} nodes to {}", created.len(), self.path.display());
        Ok(created)
    }
}
