//! Integration tests for the album downloader: staging, promotion, the
//! worker pool and full-download dedup.

use std::sync::Arc;
use std::time::Duration;

use albumcache_core::{
    AlbumDownloader, AlbumId, ArtifactKind, ArtifactStore, InFlightRegistry, OperationKind,
    ServiceError, WorkerPool,
};
use tempfile::TempDir;

mod support;
use support::fake_remote::{DownloadGate, FakeRemote};

fn id(raw: &str) -> AlbumId {
    AlbumId::parse(raw).unwrap()
}

fn downloader(
    temp: &TempDir,
    remote: &Arc<FakeRemote>,
    workers: usize,
) -> (AlbumDownloader, Arc<InFlightRegistry>) {
    let registry = Arc::new(InFlightRegistry::default());
    let downloader = AlbumDownloader::new(
        remote.clone(),
        ArtifactStore::new(temp.path()),
        Arc::clone(&registry),
        WorkerPool::new(workers).unwrap(),
    );
    (downloader, registry)
}

#[tokio::test]
async fn test_resolve_document_cache_hit_makes_no_remote_calls() {
    let temp = TempDir::new().unwrap();
    let cached = temp.path().join("pdf").join("5.pdf");
    std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
    std::fs::write(&cached, b"%PDF").unwrap();

    let remote = Arc::new(FakeRemote::new());
    let (downloader, _registry) = downloader(&temp, &remote, 2);

    let path = downloader.resolve_document(&id("5")).await.unwrap();

    assert_eq!(path, cached);
    assert_eq!(remote.total_calls(), 0);
}

#[tokio::test]
async fn test_resolve_document_promotes_staged_output() {
    let temp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::new());
    let (downloader, registry) = downloader(&temp, &remote, 2);
    let store = ArtifactStore::new(temp.path());

    let path = downloader.resolve_document(&id("5")).await.unwrap();

    assert_eq!(path, temp.path().join("pdf/5.pdf"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "%PDF-1.7 album 5");
    assert!(!store.staging_path_for(&id("5"), ArtifactKind::Document).exists());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_resolve_document_is_idempotent_once_cached() {
    let temp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::new());
    let (downloader, _registry) = downloader(&temp, &remote, 2);

    let first = downloader.resolve_document(&id("8")).await.unwrap();
    let second = downloader.resolve_document(&id("8")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(FakeRemote::count(&remote.album_downloads), 1);
}

#[tokio::test]
async fn test_resolve_document_ignores_stale_staging_file() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path());
    let staging = store.staging_path_for(&id("6"), ArtifactKind::Document);
    std::fs::create_dir_all(staging.parent().unwrap()).unwrap();
    std::fs::write(&staging, b"left over from a crash").unwrap();

    let remote = Arc::new(FakeRemote::new().without_document_output());
    let (downloader, _registry) = downloader(&temp, &remote, 1);

    let error = downloader.resolve_document(&id("6")).await.unwrap_err();

    assert!(matches!(error, ServiceError::DownloadFailed { .. }));
    assert!(!store.path_for(&id("6"), ArtifactKind::Document).exists());
}

#[tokio::test]
async fn test_resolve_document_missing_output_is_download_failed() {
    let temp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::new().without_document_output());
    let (downloader, registry) = downloader(&temp, &remote, 1);

    let error = downloader.resolve_document(&id("3")).await.unwrap_err();

    let ServiceError::DownloadFailed { source, .. } = &error else {
        panic!("expected DownloadFailed, got {error:?}");
    };
    assert!(source.to_string().contains("no document was produced"), "{source}");
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_resolve_document_adapter_failure_releases_key() {
    let temp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::new().failing_album_downloads());
    let (downloader, registry) = downloader(&temp, &remote, 1);
    let store = ArtifactStore::new(temp.path());

    let error = downloader.resolve_document(&id("4")).await.unwrap_err();

    assert!(matches!(error, ServiceError::DownloadFailed { .. }));
    assert!(!error.is_retryable());
    assert!(!store.path_for(&id("4"), ArtifactKind::Document).exists());
    assert!(registry.is_empty());

    let _ = downloader.resolve_document(&id("4")).await.unwrap_err();
    assert_eq!(FakeRemote::count(&remote.album_downloads), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resolve_document_concurrent_same_album_downloads_once() {
    let temp = TempDir::new().unwrap();
    let gate = Arc::new(DownloadGate::default());
    let remote = Arc::new(FakeRemote::new().with_gate(Arc::clone(&gate)));
    let (downloader, registry) = downloader(&temp, &remote, 2);

    let first = {
        let downloader = downloader.clone();
        tokio::spawn(async move { downloader.resolve_document(&id("5")).await })
    };
    gate.wait_entered().await;

    let second = downloader.resolve_document(&id("5")).await;
    let Err(error) = second else {
        panic!("second request must be rejected while the first runs");
    };
    assert!(matches!(
        error,
        ServiceError::Busy {
            operation: OperationKind::FullDownload,
            ..
        }
    ));
    assert!(error.is_retryable());

    gate.release_one();
    first.await.unwrap().unwrap();
    assert_eq!(FakeRemote::count(&remote.album_downloads), 1);
    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resolve_document_different_albums_never_swap_output() {
    let temp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::new().with_download_delay(Duration::from_millis(30)));
    let (downloader, _registry) = downloader(&temp, &remote, 4);

    let ids = ["101", "102", "103", "104"];
    let tasks: Vec<_> = ids
        .iter()
        .map(|raw| {
            let downloader = downloader.clone();
            let album = id(raw);
            tokio::spawn(async move { downloader.resolve_document(&album).await })
        })
        .collect();

    for (raw, task) in ids.iter().zip(tasks) {
        let path = task.await.unwrap().unwrap();
        assert_eq!(path, temp.path().join("pdf").join(format!("{raw}.pdf")));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("%PDF-1.7 album {raw}")
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resolve_document_respects_worker_pool_size() {
    let temp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::new().with_download_delay(Duration::from_millis(20)));
    let (downloader, _registry) = downloader(&temp, &remote, 1);

    let tasks: Vec<_> = ["201", "202", "203"]
        .iter()
        .map(|raw| {
            let downloader = downloader.clone();
            let album = id(raw);
            tokio::spawn(async move { downloader.resolve_document(&album).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(FakeRemote::count(&remote.album_downloads), 3);
    assert_eq!(FakeRemote::count(&remote.peak_album_downloads), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_resolve_document_dropped_request_keeps_album_busy() {
    let temp = TempDir::new().unwrap();
    let gate = Arc::new(DownloadGate::default());
    let remote = Arc::new(FakeRemote::new().with_gate(Arc::clone(&gate)));
    let (downloader, registry) = downloader(&temp, &remote, 2);

    // The caller gives up while the bulk download is still held open.
    let first =
        tokio::time::timeout(Duration::from_millis(50), downloader.resolve_document(&id("5"))).await;
    assert!(first.is_err(), "first request should time out");
    gate.wait_entered().await;

    let second = downloader.resolve_document(&id("5")).await;
    assert!(matches!(
        second,
        Err(ServiceError::Busy {
            operation: OperationKind::FullDownload,
            ..
        })
    ));

    gate.release_one();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker should release the key once it finishes");

    assert_eq!(FakeRemote::count(&remote.album_downloads), 1);
    assert_eq!(FakeRemote::count(&remote.peak_album_downloads), 1);
    let cached = temp.path().join("pdf/5.pdf");
    assert_eq!(std::fs::read_to_string(&cached).unwrap(), "%PDF-1.7 album 5");

    let third = downloader.resolve_document(&id("5")).await.unwrap();
    assert_eq!(third, cached);
    assert_eq!(FakeRemote::count(&remote.album_downloads), 1);
}
