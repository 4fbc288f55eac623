use super::error::RemoteStoreError;
use super::remote::{EntryKind, RemoteStore};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub const MEMORY_ROOT_ID: &str = "root";

/// Remote call an injected failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindChild,
    CreateFolder,
    UploadFile,
}

#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub is_folder: bool,
    pub source: Option<PathBuf>,
}

#[derive(Default)]
struct MemoryState {
    entries: Vec<MemoryEntry>,
    failures: HashMap<StoreOp, VecDeque<RemoteStoreError>>,
    calls: HashMap<StoreOp, usize>,
    next_id: usize,
}

/// In-process store with failure injection and call accounting
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Duration,
    name: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            latency: Duration::ZERO,
            name: "memory".to_string(),
        }
    }

    /// Delays every call, which widens race windows in concurrency tests
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues `error` to be returned by the next call of `op`
    pub fn fail_next(&self, op: StoreOp, error: RemoteStoreError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    pub fn fail_next_n(&self, op: StoreOp, count: usize, error: RemoteStoreError) {
        for _ in 0..count {
            self.fail_next(op, error.clone());
        }
    }

    /// Number of calls of `op`, including failed ones
    pub fn calls(&self, op: StoreOp) -> usize {
        self.state.lock().unwrap().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn add_folder(&self, parent_id: &str, name: &str) -> String {
        self.insert(parent_id, name, true, None)
    }

    pub fn add_file(&self, parent_id: &str, name: &str) -> String {
        self.insert(parent_id, name, false, None)
    }

    pub fn children(&self, parent_id: &str) -> Vec<MemoryEntry> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|e| e.parent_id == parent_id)
            .cloned()
            .collect()
    }

    pub fn folders_named(&self, parent_id: &str, name: &str) -> Vec<MemoryEntry> {
        self.children(parent_id)
            .into_iter()
            .filter(|e| e.is_folder && e.name == name)
            .collect()
    }

    pub fn file_names(&self, parent_id: &str) -> Vec<String> {
        self.children(parent_id)
            .into_iter()
            .filter(|e| !e.is_folder)
            .map(|e| e.name)
            .collect()
    }

    pub fn entry(&self, id: &str) -> Option<MemoryEntry> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    fn insert(&self, parent_id: &str, name: &str, is_folder: bool, source: Option<PathBuf>) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("mem-{}", state.next_id);
        state.entries.push(MemoryEntry {
            id: id.clone(),
            parent_id: parent_id.to_string(),
            name: name.to_string(),
            is_folder,
            source,
        });
        id
    }

    async fn begin(&self, op: StoreOp) -> Result<(), RemoteStoreError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.state.lock().unwrap();
        *state.calls.entry(op).or_insert(0) += 1;
        match state.failures.get_mut(&op).and_then(|queue| queue.pop_front()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn folder_exists(&self, id: &str) -> bool {
        id == MEMORY_ROOT_ID
            || self
                .state
                .lock()
                .unwrap()
                .entries
                .iter()
                .any(|e| e.id == id && e.is_folder)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn find_child(
        &self,
        parent_id: &str,
        name: &str,
        kind: EntryKind,
    ) -> Result<Option<String>, RemoteStoreError> {
        self.begin(StoreOp::FindChild).await?;

        let state = self.state.lock().unwrap();
        Ok(state
            .entries
            .iter()
            .find(|e| e.parent_id == parent_id && e.name == name && kind.matches_folder(e.is_folder))
            .map(|e| e.id.clone()))
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, RemoteStoreError> {
        self.begin(StoreOp::CreateFolder).await?;

        if !self.folder_exists(parent_id) {
            return Err(RemoteStoreError::not_found(format!(
                "parent folder {} does not exist",
                parent_id
            )));
        }
        Ok(self.insert(parent_id, name, true, None))
    }

    async fn upload_file(
        &self,
        parent_id: &str,
        local_path: &Path,
        name: &str,
        _mime_type: &str,
    ) -> Result<String, RemoteStoreError> {
        self.begin(StoreOp::UploadFile).await?;

        if !self.folder_exists(parent_id) {
            return Err(RemoteStoreError::not_found(format!(
                "destination folder {} does not exist",
                parent_id
            )));
        }
        Ok(self.insert(parent_id, name, false, Some(local_path.to_path_buf())))
    }

    fn default_root(&self) -> String {
        MEMORY_ROOT_ID.to_string()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("name", &self.name)
            .field("latency", &self.latency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RemoteErrorKind;

    #[tokio::test]
    async fn test_create_and_find_folder() {
        let store = MemoryStore::new();

        let id = store.create_folder(MEMORY_ROOT_ID, "OrganizedNotes").await.unwrap();
        let found = store
            .find_child(MEMORY_ROOT_ID, "OrganizedNotes", EntryKind::Folder)
            .await
            .unwrap();

        assert_eq!(found, Some(id));
        assert_eq!(store.calls(StoreOp::CreateFolder), 1);
        assert_eq!(store.calls(StoreOp::FindChild), 1);
    }

    #[tokio::test]
    async fn test_find_respects_kind() {
        let store = MemoryStore::new();
        store.add_file(MEMORY_ROOT_ID, "physics");

        let folder = store
            .find_child(MEMORY_ROOT_ID, "physics", EntryKind::Folder)
            .await
            .unwrap();
        let any = store
            .find_child(MEMORY_ROOT_ID, "physics", EntryKind::Any)
            .await
            .unwrap();

        assert!(folder.is_none());
        assert!(any.is_some());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let store = MemoryStore::new();
        store.fail_next(StoreOp::CreateFolder, RemoteStoreError::rate_limited("busy"));

        let first = store.create_folder(MEMORY_ROOT_ID, "a").await;
        let second = store.create_folder(MEMORY_ROOT_ID, "a").await;

        assert_eq!(first.unwrap_err().kind, RemoteErrorKind::RateLimited);
        assert!(second.is_ok());
        assert_eq!(store.folders_named(MEMORY_ROOT_ID, "a").len(), 1);
    }

    #[tokio::test]
    async fn test_upload_into_missing_folder() {
        let store = MemoryStore::new();

        let result = store
            .upload_file("mem-404", Path::new("/tmp/a.png"), "a.png", "image/png")
            .await;

        assert_eq!(result.unwrap_err().kind, RemoteErrorKind::NotFound);
    }
}
