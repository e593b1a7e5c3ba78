//! Integration tests for the TOML-backed FileStore

use std::fs;

use fs2::FileExt;
use rstest::rstest;
use tempfile::TempDir;

use nestset::application::services::{Folder, FolderService};
use nestset::application::{ApplicationError, HierarchyEngine};
use nestset::config::EngineSettings;
use nestset::domain::{Filter, Node, NodeId, Update};
use nestset::infrastructure::{FileStore, NodeStore, StoreError};
use nestset::util::testing::init_test_setup;

fn open_engine(path: &std::path::Path) -> HierarchyEngine<Folder, FileStore<Folder>> {
    HierarchyEngine::open("files", FileStore::open(path).unwrap(), EngineSettings::default())
        .unwrap()
}

#[test]
fn given_missing_file_when_opening_engine_then_root_is_persisted() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("folders.toml");

    // Act
    let engine = open_engine(&path);

    // Assert
    assert!(path.exists(), "bootstrap commit should create the file");
    assert_eq!(engine.root().unwrap().id, NodeId::ROOT);
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("format = 1"));
}

#[test]
fn given_committed_operations_when_reopening_then_state_is_restored() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    let (a, b) = {
        let engine = open_engine(&path);
        let a = engine.insert_child(None, Folder::new("Alpha")).unwrap();
        let b = engine
            .insert_child(Some(a.id), Folder::new("Beta").with_description("inner"))
            .unwrap();
        engine.move_subtree(b.id, None).unwrap();
        (a, b)
    };

    // Act
    let engine = open_engine(&path);

    // Assert
    let nodes = engine.snapshot().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(engine.get(a.id).unwrap().payload.name, "Alpha");
    let b = engine.get(b.id).unwrap();
    assert_eq!(b.parent, Some(NodeId::ROOT));
    assert_eq!(b.payload.description.as_deref(), Some("inner"));
    assert_eq!((b.left, b.right), (3, 4));
    engine.verify().unwrap();
}

#[test]
fn given_rolled_back_transaction_when_reopening_then_changes_are_absent() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    drop(open_engine(&path));
    let mut store: FileStore<Folder> = FileStore::open(&path).unwrap();

    // Act
    store.begin().unwrap();
    store
        .update_many(&Filter::All, &Update::shift_right(10))
        .unwrap();
    store.rollback().unwrap();

    // Assert
    let reopened: FileStore<Folder> = FileStore::open(&path).unwrap();
    let root: Node<Folder> = reopened.find_by_id(NodeId::ROOT).unwrap().unwrap();
    assert_eq!(root.right, 1);
    assert_eq!(store.find_by_id(NodeId::ROOT).unwrap().unwrap().right, 1);
}

#[test]
fn given_write_outside_transaction_when_reopening_then_write_is_durable() {
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    drop(open_engine(&path));

    let mut store: FileStore<Folder> = FileStore::open(&path).unwrap();
    assert!(store.update_payload(NodeId::ROOT, Folder::new("Top")).unwrap());

    let reopened: FileStore<Folder> = FileStore::open(&path).unwrap();
    assert_eq!(
        reopened.find_by_id(NodeId::ROOT).unwrap().unwrap().payload.name,
        "Top"
    );
}

#[test]
fn given_garbage_file_when_opening_then_decode_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    fs::write(&path, "this is = = not toml").unwrap();

    let err = FileStore::<Folder>::open(&path).unwrap_err();

    assert!(matches!(err, StoreError::Decode { .. }), "got {err:?}");
}

#[test]
fn given_unknown_format_version_when_opening_then_decode_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    fs::write(&path, "format = 2\n").unwrap();

    let err = FileStore::<Folder>::open(&path).unwrap_err();

    match err {
        StoreError::Decode { message, .. } => assert!(message.contains("version 2")),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn given_file_without_root_when_opening_engine_then_refuses_to_bootstrap() {
    // Arrange: a stored node whose root went missing
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    let orphan = {
        let engine = open_engine(&path);
        engine.insert_child(None, Folder::new("Alpha")).unwrap()
    };
    let mut store: FileStore<Folder> = FileStore::open(&path).unwrap();
    store.delete_many(&Filter::Id(NodeId::ROOT)).unwrap();
    assert!(store.find_by_id(orphan.id).unwrap().is_some());

    // Act
    let result = HierarchyEngine::open(
        "broken",
        FileStore::<Folder>::open(&path).unwrap(),
        EngineSettings::default(),
    );

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(nestset::domain::DomainError::Consistency(_)))
    ));
}

#[test]
fn given_folder_service_on_file_store_when_reopened_then_tree_survives() {
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    let photos = {
        let folders =
            FolderService::open(FileStore::open(&path).unwrap(), EngineSettings::default())
                .unwrap();
        let photos = folders.create(None, "Photos", None).unwrap();
        folders.create(Some(photos.id), "Summer 2024", None).unwrap();
        photos
    };

    let folders =
        FolderService::open(FileStore::open(&path).unwrap(), EngineSettings::default()).unwrap();
    let tree = folders.tree(None).unwrap();

    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].item.id, photos.id);
    assert_eq!(tree[0].children[0].item.payload.name_sort, "summer-2024");
    folders.verify().unwrap();
}

#[test]
fn given_two_services_on_same_file_when_both_create_then_neither_write_is_lost() {
    // Arrange: both open before either writes, as two processes would
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    let first =
        FolderService::open(FileStore::open(&path).unwrap(), EngineSettings::default()).unwrap();
    let second =
        FolderService::open(FileStore::open(&path).unwrap(), EngineSettings::default()).unwrap();

    // Act
    let alpha = first.create(None, "Alpha", None).unwrap();
    let bravo = second.create(None, "Bravo", None).unwrap();

    // Assert
    assert_eq!((alpha.left, alpha.right), (1, 2));
    assert_eq!((bravo.left, bravo.right), (3, 4));
    let reopened =
        FolderService::open(FileStore::open(&path).unwrap(), EngineSettings::default()).unwrap();
    let names: Vec<String> = reopened
        .children(None)
        .unwrap()
        .into_iter()
        .map(|n| n.payload.name)
        .collect();
    assert_eq!(names, vec!["Alpha", "Bravo"]);
    reopened.verify().unwrap();
}

#[test]
fn given_stale_store_when_writing_outside_transaction_then_sees_other_writers() {
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    drop(open_engine(&path));
    let mut stale: FileStore<Folder> = FileStore::open(&path).unwrap();
    let alpha = open_engine(&path).insert_child(None, Folder::new("Alpha")).unwrap();

    assert!(stale.update_payload(NodeId::ROOT, Folder::new("Top")).unwrap());

    let reopened: FileStore<Folder> = FileStore::open(&path).unwrap();
    assert!(reopened.find_by_id(alpha.id).unwrap().is_some());
    assert_eq!(
        reopened.find_by_id(NodeId::ROOT).unwrap().unwrap().payload.name,
        "Top"
    );
}

#[rstest]
#[case::commit(true)]
#[case::rollback(false)]
fn given_finished_transaction_when_locking_sidecar_then_lock_is_free(#[case] commit: bool) {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("folders.toml");
    drop(open_engine(&path));
    let mut store: FileStore<Folder> = FileStore::open(&path).unwrap();
    store.begin().unwrap();
    let held = fs::File::open(store.lock_path()).unwrap();
    assert!(held.try_lock_exclusive().is_err(), "lock held during transaction");

    // Act
    if commit {
        store.commit().unwrap();
    } else {
        store.rollback().unwrap();
    }

    // Assert
    let other = fs::File::open(store.lock_path()).unwrap();
    assert!(other.try_lock_exclusive().is_ok());
    FileExt::unlock(&other).unwrap();
}
