use keepsake_error::{KeepsakeErrorKind, StorageErrorKind};
use keepsake_storage::LocalMediaStore;
use std::path::Path;
use tempfile::TempDir;

#[tokio::test]
async fn resolves_relative_paths_against_root() {
    let dir = TempDir::new().unwrap();
    let store = LocalMediaStore::new(dir.path().join("media")).unwrap();

    assert_eq!(
        store.resolve(Path::new("2024/a.jpg")),
        dir.path().join("media").join("2024/a.jpg")
    );
    assert_eq!(store.resolve(Path::new("/abs/a.jpg")), Path::new("/abs/a.jpg"));
}

#[tokio::test]
async fn measures_and_hashes_files() {
    let dir = TempDir::new().unwrap();
    let store = LocalMediaStore::new(dir.path()).unwrap();
    tokio::fs::write(dir.path().join("a.jpg"), b"hello").await.unwrap();

    assert_eq!(store.file_size(Path::new("a.jpg")).await.unwrap(), 5);
    assert!(store.exists(Path::new("a.jpg")).await);
    assert_eq!(
        store.sha256(Path::new("a.jpg")).await.unwrap(),
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
}

#[tokio::test]
async fn missing_file_is_a_permanent_error() {
    let dir = TempDir::new().unwrap();
    let store = LocalMediaStore::new(dir.path()).unwrap();

    let err = store.file_size(Path::new("gone.jpg")).await.unwrap_err();
    assert!(err.is_permanent());
    match err.kind() {
        KeepsakeErrorKind::Storage(e) => assert!(matches!(e.kind, StorageErrorKind::Missing(_))),
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn release_tolerates_missing_files() {
    let dir = TempDir::new().unwrap();
    let store = LocalMediaStore::new(dir.path()).unwrap();
    let path = dir.path().join("a.jpg");
    tokio::fs::write(&path, b"data").await.unwrap();

    assert!(store.release(&path).await.unwrap());
    assert!(!path.exists());
    assert!(!store.release(&path).await.unwrap());
}
