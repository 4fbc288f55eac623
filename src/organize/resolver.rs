//! Subject folder resolution
//!
//! Maps a subject to its folder `root/OrganizedNotes/<subject>`, reusing
//! folders that already exist and creating missing ones. Resolutions are
//! cached for the lifetime of the resolver (one run).
//!
//! Each subject owns a [`OnceCell`] in the cache. The lookup-or-create
//! sequence runs inside that cell's initialiser, so concurrent resolutions of
//! one subject share a single remote creation while unrelated subjects
//! proceed independently. A failed initialisation leaves the cell empty and
//! the next caller starts over.

use crate::store::{EntryKind, RemoteStore, RemoteStoreError, RetryPolicy, BASE_FOLDER_NAME};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// A resolved subject folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderHandle {
    pub subject: String,
    pub folder_id: String,
    /// Folder ids from the root down to this folder:
    /// `[root, OrganizedNotes, subject]`
    pub lineage: Vec<String>,
}

impl FolderHandle {
    /// Human readable location, e.g. `OrganizedNotes/physics`
    pub fn display_path(&self) -> String {
        format!("{}/{}", BASE_FOLDER_NAME, self.subject)
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.lineage
            .len()
            .checked_sub(2)
            .and_then(|i| self.lineage.get(i))
            .map(String::as_str)
    }
}

pub struct FolderResolver {
    store: Arc<dyn RemoteStore>,
    root_id: String,
    retry: RetryPolicy,
    base: OnceCell<String>,
    cache: Mutex<HashMap<String, Arc<OnceCell<FolderHandle>>>>,
    folders_created: AtomicUsize,
}

impl FolderResolver {
    pub fn new(store: Arc<dyn RemoteStore>, root_id: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            store,
            root_id: root_id.into(),
            retry,
            base: OnceCell::new(),
            cache: Mutex::new(HashMap::new()),
            folders_created: AtomicUsize::new(0),
        }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Id of the `OrganizedNotes` folder, looked up or created on first call
    pub async fn base_folder(&self) -> Result<String, RemoteStoreError> {
        let id = self
            .base
            .get_or_try_init(|| self.lookup_or_create(&self.root_id, BASE_FOLDER_NAME))
            .await?;
        Ok(id.clone())
    }

    /// Resolves `subject` to its folder, creating it if needed
    pub async fn resolve(&self, subject: &str) -> Result<FolderHandle, RemoteStoreError> {
        let cell = {
            let mut cache = self.cache.lock().await;
            cache.entry(subject.to_string()).or_default().clone()
        };

        if let Some(handle) = cell.get() {
            debug!(subject, folder_id = %handle.folder_id, "Folder cache hit");
            return Ok(handle.clone());
        }

        let handle = cell
            .get_or_try_init(|| async {
                let base_id = self.base_folder().await?;
                let folder_id = self.lookup_or_create(&base_id, subject).await?;
                Ok::<_, RemoteStoreError>(FolderHandle {
                    subject: subject.to_string(),
                    folder_id: folder_id.clone(),
                    lineage: vec![self.root_id.clone(), base_id, folder_id],
                })
            })
            .await?;

        Ok(handle.clone())
    }

    /// Cached handle for `subject`, without touching the store
    pub async fn cached(&self, subject: &str) -> Option<FolderHandle> {
        let cache = self.cache.lock().await;
        cache.get(subject).and_then(|cell| cell.get().cloned())
    }

    /// Number of folders this resolver created in the store
    pub fn folders_created(&self) -> usize {
        self.folders_created.load(Ordering::SeqCst)
    }

    /// Finds `name` under `parent_id` or creates it. Every retry repeats the
    /// lookup, so a creation that succeeded remotely but failed locally is
    /// picked up instead of duplicated.
    async fn lookup_or_create(&self, parent_id: &str, name: &str) -> Result<String, RemoteStoreError> {
        let operation = format!("resolve folder '{}'", name);
        self.retry
            .run(&operation, || async move {
                if let Some(id) = self.store.find_child(parent_id, name, EntryKind::Folder).await? {
                    debug!(name, folder_id = %id, "Reusing existing folder");
                    return Ok(id);
                }

                let id = self.store.create_folder(parent_id, name).await?;
                self.folders_created.fetch_add(1, Ordering::SeqCst);
                info!(name, parent_id, folder_id = %id, store = self.store.name(), "Created folder");
                Ok(id)
            })
            .await
    }
}

impl std::fmt::Debug for FolderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderResolver")
            .field("store", &self.store.name())
            .field("root_id", &self.root_id)
            .field("folders_created", &self.folders_created())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreOp, MEMORY_ROOT_ID};
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(3)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2))
    }

    fn resolver(store: Arc<MemoryStore>) -> FolderResolver {
        FolderResolver::new(store, MEMORY_ROOT_ID, fast_retry())
    }

    #[tokio::test]
    async fn test_resolve_creates_base_then_subject() {
        let store = Arc::new(MemoryStore::new());
        let resolver = resolver(store.clone());

        let handle = resolver.resolve("physics").await.unwrap();

        let base = store.folders_named(MEMORY_ROOT_ID, BASE_FOLDER_NAME);
        assert_eq!(base.len(), 1);
        assert_eq!(store.folders_named(&base[0].id, "physics").len(), 1);
        assert_eq!(handle.lineage, vec![MEMORY_ROOT_ID.to_string(), base[0].id.clone(), handle.folder_id.clone()]);
        assert_eq!(handle.parent_id(), Some(base[0].id.as_str()));
        assert_eq!(handle.display_path(), "OrganizedNotes/physics");
        assert_eq!(resolver.folders_created(), 2);
    }

    #[tokio::test]
    async fn test_second_resolve_is_cached() {
        let store = Arc::new(MemoryStore::new());
        let resolver = resolver(store.clone());

        let first = resolver.resolve("history").await.unwrap();
        let lookups = store.calls(StoreOp::FindChild);
        let second = resolver.resolve("history").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.calls(StoreOp::FindChild), lookups);
        assert_eq!(resolver.cached("history").await, Some(first));
    }

    #[tokio::test]
    async fn test_existing_folders_are_reused() {
        let store = Arc::new(MemoryStore::new());
        let base = store.add_folder(MEMORY_ROOT_ID, BASE_FOLDER_NAME);
        let art = store.add_folder(&base, "art");
        let resolver = resolver(store.clone());

        let handle = resolver.resolve("art").await.unwrap();

        assert_eq!(handle.folder_id, art);
        assert_eq!(store.calls(StoreOp::CreateFolder), 0);
        assert_eq!(resolver.folders_created(), 0);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next(StoreOp::FindChild, RemoteStoreError::auth_expired("token revoked"));
        let resolver = resolver(store.clone());

        let err = resolver.resolve("music").await.unwrap_err();
        assert_eq!(err.kind, crate::store::RemoteErrorKind::AuthExpired);
        assert!(resolver.cached("music").await.is_none());

        assert!(resolver.resolve("music").await.is_ok());
    }

    #[tokio::test]
    async fn test_unrelated_subjects_get_distinct_folders() {
        let store = Arc::new(MemoryStore::new());
        let resolver = resolver(store.clone());

        let (a, b) = tokio::join!(resolver.resolve("art"), resolver.resolve("music"));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.folder_id, b.folder_id);
        assert_eq!(a.lineage[1], b.lineage[1]);
        assert_eq!(store.folders_named(MEMORY_ROOT_ID, BASE_FOLDER_NAME).len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_resolve_leaves_subject_resolvable() {
        let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(30)));
        let resolver = resolver(store.clone());

        let dropped = tokio::time::timeout(Duration::from_millis(5), resolver.resolve("chemistry")).await;
        assert!(dropped.is_err());
        assert!(resolver.cached("chemistry").await.is_none());

        let handle = tokio::time::timeout(Duration::from_secs(5), resolver.resolve("chemistry"))
            .await
            .expect("resolve must not wait on the dropped call")
            .unwrap();
        assert_eq!(resolver.cached("chemistry").await, Some(handle));
    }
}
