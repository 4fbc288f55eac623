//! Directory-backed store for offline runs
//!
//! Folders are directories below a configured root and ids are `/`-separated
//! paths relative to that root, with `.` naming the root itself.
//!
//! Uploads are written to a hidden `.part` sibling and hard-linked to their
//! final name once the copy is complete, so a visible file is never partial.

use super::error::RemoteStoreError;
use super::remote::{EntryKind, RemoteStore};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

pub const LOCAL_ROOT_ID: &str = ".";

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Opens a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RemoteStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| map_io_error(e, &root))?;
        debug!(root = %root.display(), "Opened local store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path behind a store id
    pub fn path_of(&self, id: &str) -> PathBuf {
        if id == LOCAL_ROOT_ID {
            return self.root.clone();
        }
        id.split('/').fold(self.root.clone(), |path, part| path.join(part))
    }

    fn child_id(parent_id: &str, name: &str) -> Result<String, RemoteStoreError> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(RemoteStoreError::fatal(format!("invalid entry name: {:?}", name)));
        }
        Ok(if parent_id == LOCAL_ROOT_ID {
            name.to_string()
        } else {
            format!("{}/{}", parent_id, name)
        })
    }

    async fn require_folder(&self, id: &str) -> Result<PathBuf, RemoteStoreError> {
        let path = self.path_of(id);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(path),
            Ok(_) => Err(RemoteStoreError::fatal(format!("{} is not a folder", id))),
            Err(e) => Err(map_io_error(e, &path)),
        }
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn find_child(
        &self,
        parent_id: &str,
        name: &str,
        kind: EntryKind,
    ) -> Result<Option<String>, RemoteStoreError> {
        self.require_folder(parent_id).await?;
        let id = Self::child_id(parent_id, name)?;

        match fs::metadata(self.path_of(&id)).await {
            Ok(meta) if kind.matches_folder(meta.is_dir()) => Ok(Some(id)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io_error(e, &self.path_of(&id))),
        }
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, RemoteStoreError> {
        self.require_folder(parent_id).await?;
        let id = Self::child_id(parent_id, name)?;
        let path = self.path_of(&id);

        match fs::create_dir(&path).await {
            Ok(()) => Ok(id),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(id),
            Err(e) => Err(map_io_error(e, &path)),
        }
    }

    async fn upload_file(
        &self,
        parent_id: &str,
        local_path: &Path,
        name: &str,
        _mime_type: &str,
    ) -> Result<String, RemoteStoreError> {
        self.require_folder(parent_id).await?;
        let id = Self::child_id(parent_id, name)?;
        let dest = self.path_of(&id);

        let part = PartFile(dest.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4())));

        let mut source = fs::File::open(local_path)
            .await
            .map_err(|e| map_io_error(e, local_path))?;
        let mut target = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part.0)
            .await
            .map_err(|e| map_io_error(e, &part.0))?;

        tokio::io::copy(&mut source, &mut target)
            .await
            .map_err(|e| map_io_error(e, &part.0))?;
        target.flush().await.map_err(|e| map_io_error(e, &part.0))?;
        drop(target);

        // hard_link refuses an existing destination, unlike rename
        fs::hard_link(&part.0, &dest)
            .await
            .map_err(|e| map_io_error(e, &dest))?;

        Ok(id)
    }

    fn default_root(&self) -> String {
        LOCAL_ROOT_ID.to_string()
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Temporary upload target, removed when the upload finishes or is dropped
struct PartFile(PathBuf);

impl Drop for PartFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn map_io_error(error: io::Error, path: &Path) -> RemoteStoreError {
    let message = format!("{}: {}", path.display(), error);
    match error.kind() {
        io::ErrorKind::NotFound => RemoteStoreError::not_found(message),
        io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            RemoteStoreError::transient(message)
        }
        _ => RemoteStoreError::fatal(message),
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").field("root", &self.root).finish()
    }
}
