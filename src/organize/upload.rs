//! Placing note files into subject folders
//!
//! Name collisions are resolved by version suffix: when `lecture.png`
//! already exists in the destination the file is uploaded as
//! `lecture (1).png`, then `lecture (2).png` and so on. Existing remote
//! objects are never overwritten. Names picked by uploads still in flight
//! are claimed locally until the upload ends, so two concurrent uploads of
//! the same name into one folder never settle on the same suffix.

use super::resolver::FolderHandle;
use crate::note::NoteFile;
use crate::store::{EntryKind, RemoteStore, RemoteStoreError, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Highest version suffix tried before giving up on a name
pub const MAX_VERSION_SUFFIX: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub file_id: String,
    /// Name the file was stored under, including any version suffix
    pub remote_name: String,
    pub folder_id: String,
}

impl UploadResult {
    pub fn renamed(&self, note: &NoteFile) -> bool {
        self.remote_name != note.file_name
    }
}

pub struct UploadCoordinator {
    store: Arc<dyn RemoteStore>,
    retry: RetryPolicy,
    claimed: Mutex<HashSet<(String, String)>>,
}

impl UploadCoordinator {
    pub fn new(store: Arc<dyn RemoteStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    pub async fn upload(
        &self,
        note: &NoteFile,
        destination: &FolderHandle,
    ) -> Result<UploadResult, RemoteStoreError> {
        let folder_id = destination.folder_id.as_str();
        let remote_name = self.claim_free_name(folder_id, &note.file_name).await?;

        let result = self.put(note, folder_id, &remote_name).await;
        // once stored, the remote listing guards the name
        self.release(folder_id, &remote_name).await;

        let file_id = result?;
        info!(
            file = %note.file_name,
            remote_name = %remote_name,
            folder = %destination.display_path(),
            file_id = %file_id,
            "Uploaded note"
        );
        Ok(UploadResult {
            file_id,
            remote_name,
            folder_id: folder_id.to_string(),
        })
    }

    /// Names currently claimed by uploads in flight
    pub async fn pending_claims(&self) -> usize {
        self.claimed.lock().await.len()
    }

    async fn release(&self, folder_id: &str, name: &str) {
        self.claimed
            .lock()
            .await
            .remove(&(folder_id.to_string(), name.to_string()));
    }

    /// Claims the first version of `file_name` that is neither claimed by
    /// another upload nor stored in `folder_id`.
    ///
    /// The claim is taken before the remote lookup, so a name released by a
    /// finished upload is always seen as stored by the next claimant.
    async fn claim_free_name(&self, folder_id: &str, file_name: &str) -> Result<String, RemoteStoreError> {
        for version in 0..=MAX_VERSION_SUFFIX {
            let candidate = versioned_name(file_name, version);

            if !self
                .claimed
                .lock()
                .await
                .insert((folder_id.to_string(), candidate.clone()))
            {
                continue;
            }

            let existing = self
                .retry
                .run("find existing file", || {
                    self.store.find_child(folder_id, &candidate, EntryKind::Any)
                })
                .await;
            match existing {
                Ok(None) => return Ok(candidate),
                Ok(Some(_)) => {
                    debug!(folder_id, name = %candidate, "Name taken, trying next version");
                    self.release(folder_id, &candidate).await;
                }
                Err(e) => {
                    self.release(folder_id, &candidate).await;
                    return Err(e);
                }
            }
        }

        Err(RemoteStoreError::fatal(format!(
            "no free name for '{}' after {} versions",
            file_name, MAX_VERSION_SUFFIX
        )))
    }

    /// Uploads under a claimed name. A retry first checks whether the previous
    /// attempt landed despite reporting an error, and adopts that file.
    async fn put(&self, note: &NoteFile, folder_id: &str, remote_name: &str) -> Result<String, RemoteStoreError> {
        let mut attempt = 0u32;
        self.retry
            .run("upload file", || {
                attempt += 1;
                let retrying = attempt > 1;
                async move {
                    if retrying {
                        if let Some(id) = self
                            .store
                            .find_child(folder_id, remote_name, EntryKind::File)
                            .await?
                        {
                            debug!(name = remote_name, file_id = %id, "Previous upload attempt landed");
                            return Ok(id);
                        }
                    }
                    self.store
                        .upload_file(folder_id, &note.path, remote_name, &note.mime_type)
                        .await
                }
            })
            .await
    }
}

impl std::fmt::Debug for UploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCoordinator")
            .field("store", &self.store.name())
            .finish()
    }
}

/// `name.ext` for version 0, `name (n).ext` after that
pub fn versioned_name(file_name: &str, version: u32) -> String {
    if version == 0 {
        return file_name.to_string();
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, version, ext.to_string_lossy()),
        None => format!("{} ({})", stem, version),
    }
}
