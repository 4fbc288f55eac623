use super::error::RemoteStoreError;
use async_trait::async_trait;
use std::path::Path;

/// Name used for the folder that holds every subject folder
pub const BASE_FOLDER_NAME: &str = "OrganizedNotes";

/// What kind of child a lookup should match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    File,
    Any,
}

impl EntryKind {
    pub fn matches_folder(self, is_folder: bool) -> bool {
        match self {
            EntryKind::Folder => is_folder,
            EntryKind::File => !is_folder,
            EntryKind::Any => true,
        }
    }
}

/// Remote storage operations the organizer depends on
///
/// Identifiers are opaque strings owned by the store. Implementations must
/// report failures through [`RemoteStoreError`] so callers can decide whether
/// a retry makes sense.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the id of a child of `parent_id` named `name`, if one exists
    async fn find_child(
        &self,
        parent_id: &str,
        name: &str,
        kind: EntryKind,
    ) -> Result<Option<String>, RemoteStoreError>;

    /// Creates a folder named `name` under `parent_id` and returns its id
    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, RemoteStoreError>;

    /// Uploads `local_path` under `parent_id` as `name` and returns the new file id
    async fn upload_file(
        &self,
        parent_id: &str,
        local_path: &Path,
        name: &str,
        mime_type: &str,
    ) -> Result<String, RemoteStoreError>;

    /// Id used as the parent of the base folder when no root is configured
    fn default_root(&self) -> String;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_matching() {
        assert!(EntryKind::Folder.matches_folder(true));
        assert!(!EntryKind::Folder.matches_folder(false));
        assert!(EntryKind::File.matches_folder(false));
        assert!(!EntryKind::File.matches_folder(true));
        assert!(EntryKind::Any.matches_folder(true));
        assert!(EntryKind::Any.matches_folder(false));
    }
}
