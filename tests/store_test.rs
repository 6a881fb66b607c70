//! Contract tests run against every TreeStore backend

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use rstest::rstest;
use tempfile::TempDir;

use paramtree::application::services::TreeService;
use paramtree::domain::{NodeDraft, NodeSpec, ParentRef, RootId};
use paramtree::infrastructure::store::{
    FileTreeStore, MemoryTreeStore, NodeFilter, StoreError, TreeStore,
};
use paramtree::infrastructure::traits::RealFileSystem;

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    File,
}

/// Store plus the temp dir that must outlive it.
struct Harness {
    store: Box<dyn TreeStore>,
    _dir: Option<TempDir>,
}

fn open(backend: Backend) -> Harness {
    match backend {
        Backend::Memory => Harness {
            store: Box::new(MemoryTreeStore::new()),
            _dir: None,
        },
        Backend::File => {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("nested").join("trees.json");
            Harness {
                store: Box::new(FileTreeStore::new(path, Arc::new(RealFileSystem))),
                _dir: Some(dir),
            }
        }
    }
}

fn draft(name: &str, level: u32, parent: ParentRef) -> NodeDraft {
    NodeDraft {
        name: name.into(),
        kind: "t".into(),
        level,
        parent,
    }
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::file(Backend::File)]
fn given_roots_when_querying_then_ordered_by_id(#[case] backend: Backend) {
    let h = open(backend);
    let geo = h.store.create_root("geo").unwrap();
    let device = h.store.create_root("device").unwrap();

    assert!(geo.id < device.id);
    assert_eq!(h.store.list_roots().unwrap(), vec![geo.clone(), device.clone()]);
    assert_eq!(h.store.find_root_by_name("device").unwrap(), Some(device.clone()));
    assert_eq!(h.store.find_root_by_name("color").unwrap(), None);

    let found = h
        .store
        .find_roots_by_names(&["device".into(), "color".into(), "geo".into()])
        .unwrap();
    assert_eq!(found, vec![geo, device]);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::file(Backend::File)]
fn given_taken_root_name_when_creating_then_duplicate_root(#[case] backend: Backend) {
    let h = open(backend);
    h.store.create_root("geo").unwrap();

    let err = h.store.create_root("geo").unwrap_err();

    assert!(matches!(err, StoreError::DuplicateRoot(ref n) if n == "geo"));
    assert_eq!(h.store.list_roots().unwrap().len(), 1);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::file(Backend::File)]
fn given_batch_when_inserting_then_filters_find_nodes(#[case] backend: Backend) {
    // Arrange
    let h = open(backend);
    let root = h.store.create_root("geo").unwrap();

    // Act
    let created = h
        .store
        .create_nodes(
            root.id,
            &[
                draft("US", 1, ParentRef::None),
                draft("push", 2, ParentRef::Batch(0)),
                draft("banner", 2, ParentRef::Batch(0)),
                draft("UK", 1, ParentRef::None),
            ],
        )
        .unwrap();

    // Assert
    let us = &created[0];
    assert_eq!(created[1].parent_id, Some(us.id));

    let top: Vec<_> = h
        .store
        .find_nodes(&NodeFilter::under_root(root.id).parentless())
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(top, vec!["UK", "US"]);

    let children: Vec<_> = h
        .store
        .find_nodes(&NodeFilter::under_root(root.id).child_of(us.id))
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(children, vec!["banner", "push"]);

    let named = h
        .store
        .find_nodes(&NodeFilter::under_root(root.id).at_level(2).named(["push", "US"]))
        .unwrap();
    assert_eq!(named.len(), 1);
    assert_eq!(named[0].name, "push");
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::file(Backend::File)]
fn given_conflicting_batch_when_inserting_then_nothing_is_written(#[case] backend: Backend) {
    let h = open(backend);
    let root = h.store.create_root("geo").unwrap();
    h.store
        .create_nodes(root.id, &[draft("US", 1, ParentRef::None)])
        .unwrap();

    let err = h
        .store
        .create_nodes(
            root.id,
            &[
                draft("UK", 1, ParentRef::None),
                draft("US", 1, ParentRef::None),
            ],
        )
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::UniqueViolation { ref name, level: 1, parent_id: None } if name == "US"
    ));
    assert_eq!(
        h.store
            .find_nodes(&NodeFilter::under_root(root.id))
            .unwrap()
            .len(),
        1
    );
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::file(Backend::File)]
fn given_same_name_under_other_roots_when_inserting_then_allowed(#[case] backend: Backend) {
    let h = open(backend);
    let geo = h.store.create_root("geo").unwrap();
    let device = h.store.create_root("device").unwrap();

    h.store
        .create_nodes(geo.id, &[draft("main", 1, ParentRef::None)])
        .unwrap();
    h.store
        .create_nodes(device.id, &[draft("main", 1, ParentRef::None)])
        .unwrap();

    let all = h.store.find_nodes(&NodeFilter::default()).unwrap();
    assert_eq!(all.len(), 2);
    assert_ne!(all[0].id, all[1].id);
}

#[rstest]
#[case::memory(Backend::Memory, ParentRef::None, 2)]
#[case::file(Backend::File, ParentRef::None, 2)]
#[case::memory_forward_ref(Backend::Memory, ParentRef::Batch(1), 2)]
#[case::file_level_one_with_parent(Backend::File, ParentRef::Batch(0), 1)]
fn given_invalid_parent_when_inserting_then_missing_parent(
    #[case] backend: Backend,
    #[case] parent: ParentRef,
    #[case] level: u32,
) {
    let h = open(backend);
    let root = h.store.create_root("geo").unwrap();

    let err = h
        .store
        .create_nodes(
            root.id,
            &[draft("US", 1, ParentRef::None), draft("push", level, parent)],
        )
        .unwrap_err();

    assert!(matches!(err, StoreError::MissingParent { ref name } if name == "push"));
    assert!(h
        .store
        .find_nodes(&NodeFilter::under_root(root.id))
        .unwrap()
        .is_empty());
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::file(Backend::File)]
fn given_parent_from_other_root_when_inserting_then_missing_parent(#[case] backend: Backend) {
    let h = open(backend);
    let geo = h.store.create_root("geo").unwrap();
    let device = h.store.create_root("device").unwrap();
    let us = h
        .store
        .create_nodes(geo.id, &[draft("US", 1, ParentRef::None)])
        .unwrap()
        .remove(0);

    let err = h
        .store
        .create_nodes(device.id, &[draft("ios", 2, ParentRef::Existing(us.id))])
        .unwrap_err();

    assert!(matches!(err, StoreError::MissingParent { .. }));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::file(Backend::File)]
fn given_unknown_root_when_inserting_then_missing_root(#[case] backend: Backend) {
    let h = open(backend);

    let err = h
        .store
        .create_nodes(RootId(99), &[draft("US", 1, ParentRef::None)])
        .unwrap_err();

    assert!(matches!(err, StoreError::MissingRoot(RootId(99))));
}

#[test]
fn given_file_store_when_reopened_then_previous_writes_are_visible() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trees.json");
    let first = FileTreeStore::new(&path, Arc::new(RealFileSystem));
    let root = first.create_root("geo").unwrap();
    first
        .create_nodes(
            root.id,
            &[
                draft("US", 1, ParentRef::None),
                draft("push", 2, ParentRef::Batch(0)),
            ],
        )
        .unwrap();

    // Act
    let second = FileTreeStore::new(&path, Arc::new(RealFileSystem));

    // Assert
    assert_eq!(second.find_root_by_name("geo").unwrap(), Some(root.clone()));
    let nodes = second.find_nodes(&NodeFilter::under_root(root.id)).unwrap();
    assert_eq!(nodes.len(), 2);

    // ids keep counting from the persisted state
    let next = second
        .create_nodes(root.id, &[draft("UK", 1, ParentRef::None)])
        .unwrap();
    assert!(nodes.iter().all(|n| n.id < next[0].id));
}

#[test]
fn given_empty_store_file_when_reading_then_treated_as_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trees.json");
    fs::write(&path, "  \n").unwrap();

    let store = FileTreeStore::new(&path, Arc::new(RealFileSystem));

    assert!(store.list_roots().unwrap().is_empty());
}

#[test]
fn given_separate_file_stores_on_one_path_when_building_concurrently_then_no_write_is_lost() {
    // Arrange: one store instance per writer, as with separate processes
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trees.json");
    let writers = 4;
    let roots_per_writer = 25;

    // Act
    let handles: Vec<_> = (0..writers)
        .map(|w| {
            let path = path.clone();
            thread::spawn(move || {
                let store = Arc::new(FileTreeStore::new(path, Arc::new(RealFileSystem)));
                let service = TreeService::new(store);
                for r in 0..roots_per_writer {
                    service
                        .build(&format!("root-{w}-{r}"), &[NodeSpec::top("main")])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Assert
    let store = FileTreeStore::new(&path, Arc::new(RealFileSystem));
    let roots = store.list_roots().unwrap();
    assert_eq!(roots.len(), writers * roots_per_writer);
    let root_ids: HashSet<_> = roots.iter().map(|r| r.id).collect();
    assert_eq!(root_ids.len(), roots.len());

    let nodes = store.find_nodes(&NodeFilter::default()).unwrap();
    assert_eq!(nodes.len(), writers * roots_per_writer);
    let node_ids: HashSet<_> = nodes.iter().map(|n| n.id).collect();
    assert_eq!(node_ids.len(), nodes.len());
    for root in &roots {
        assert_eq!(
            store
                .find_nodes(&NodeFilter::under_root(root.id))
                .unwrap()
                .len(),
            1,
            "root {} lost its node",
            root.name
        );
    }
}
