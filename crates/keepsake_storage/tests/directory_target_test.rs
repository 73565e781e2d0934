use chrono::Utc;
use keepsake_core::{AcquiredAttrs, MediaRecord};
use keepsake_interface::{ReplicationRequest, ReplicationTarget};
use keepsake_storage::DirectoryReplicationTarget;
use std::path::Path;
use tempfile::TempDir;

async fn request_for(dir: &Path, contents: &[u8]) -> ReplicationRequest {
    let local = dir.join("IMG_0001.jpg");
    tokio::fs::write(&local, contents).await.unwrap();
    let attrs = AcquiredAttrs::new(&local, contents.len() as u64, Utc::now());
    let record = MediaRecord::acquired("rec-1", "photo123", &attrs, Utc::now());
    ReplicationRequest::for_record(&record).unwrap()
}

#[tokio::test]
async fn copies_and_confirms() {
    let source = TempDir::new().unwrap();
    let nas = TempDir::new().unwrap();
    let target = DirectoryReplicationTarget::new("nas", nas.path()).unwrap();
    let request = request_for(source.path(), b"jpeg bytes").await;

    assert_eq!(target.destination_id(), "nas");
    assert!(target.replicate(&request).await.unwrap());

    let replica = target.replica_path(&request);
    assert_eq!(replica, nas.path().join("rec-1").join("IMG_0001.jpg"));
    assert_eq!(tokio::fs::read(&replica).await.unwrap(), b"jpeg bytes");

    let mut partial = replica.clone().into_os_string();
    partial.push(".partial");
    assert!(!Path::new(&partial).exists());
}

#[tokio::test]
async fn rerun_reconciles_existing_replica() {
    let source = TempDir::new().unwrap();
    let nas = TempDir::new().unwrap();
    let target = DirectoryReplicationTarget::new("nas", nas.path())
        .unwrap()
        .with_checksum(true);
    let request = request_for(source.path(), b"jpeg bytes").await;

    assert!(target.replicate(&request).await.unwrap());
    assert!(target.replicate(&request).await.unwrap());

    // A truncated replica is replaced.
    let replica = target.replica_path(&request);
    tokio::fs::write(&replica, b"jpeg").await.unwrap();
    assert!(target.replicate(&request).await.unwrap());
    assert_eq!(tokio::fs::read(&replica).await.unwrap(), b"jpeg bytes");

    // Same size, different content: only caught with checksums enabled.
    tokio::fs::write(&replica, b"JPEG BYTES").await.unwrap();
    assert!(target.replicate(&request).await.unwrap());
    assert_eq!(tokio::fs::read(&replica).await.unwrap(), b"jpeg bytes");
}

#[tokio::test]
async fn missing_source_is_permanent() {
    let source = TempDir::new().unwrap();
    let nas = TempDir::new().unwrap();
    let target = DirectoryReplicationTarget::new("nas", nas.path()).unwrap();
    let request = request_for(source.path(), b"x").await;
    tokio::fs::remove_file(request.local_path()).await.unwrap();

    let err = target.replicate(&request).await.unwrap_err();
    assert!(err.is_permanent());
}
