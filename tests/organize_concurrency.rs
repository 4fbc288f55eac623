//! Concurrency properties of folder resolution and uploads

use notefiler::note::NoteFile;
use notefiler::organize::{FolderResolver, UploadCoordinator};
use notefiler::store::{MemoryStore, RetryPolicy, StoreOp, BASE_FOLDER_NAME, MEMORY_ROOT_ID};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new().with_backoff(Duration::from_millis(1), Duration::from_millis(5))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolves_create_one_folder() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(10)));
    let resolver = Arc::new(FolderResolver::new(
        store.clone(),
        MEMORY_ROOT_ID,
        fast_retry(),
    ));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let resolver = resolver.clone();
        tasks.spawn(async move { resolver.resolve("chemistry").await });
    }

    let mut handles = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        handles.push(joined.unwrap().unwrap());
    }

    // base folder + chemistry
    assert_eq!(store.calls(StoreOp::CreateFolder), 2);
    assert!(handles.windows(2).all(|w| w[0] == w[1]));

    let base = store.folders_named(MEMORY_ROOT_ID, BASE_FOLDER_NAME);
    assert_eq!(base.len(), 1);
    assert_eq!(store.folders_named(&base[0].id, "chemistry").len(), 1);
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let resolver = FolderResolver::new(store.clone(), MEMORY_ROOT_ID, fast_retry());

    let first = resolver.resolve("geography").await.unwrap();
    let second = resolver.resolve("geography").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(resolver.folders_created(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_of_same_name_never_collide() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(5)));
    let resolver = FolderResolver::new(store.clone(), MEMORY_ROOT_ID, fast_retry());
    let folder = resolver.resolve("literature").await.unwrap();
    let coordinator = Arc::new(UploadCoordinator::new(store.clone(), fast_retry()));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..6 {
        let dir = temp.path().join(format!("batch{}", i));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("essay.png");
        std::fs::write(&path, b"scan").unwrap();
        let note = NoteFile::from_path(&path).unwrap();

        let coordinator = coordinator.clone();
        let folder = folder.clone();
        tasks.spawn(async move { coordinator.upload(&note, &folder).await });
    }

    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        let result = joined.unwrap().unwrap();
        ids.insert(result.file_id);
        names.insert(result.remote_name);
    }

    assert_eq!(ids.len(), 6);
    assert_eq!(names.len(), 6);
    assert!(names.contains("essay.png"));
    assert!(names.contains("essay (5).png"));
    assert_eq!(store.file_names(&folder.folder_id).len(), 6);
    assert_eq!(coordinator.pending_claims().await, 0);
}
