//! Subject folders and uploads into them

mod resolver;
mod upload;

pub use resolver::{FolderHandle, FolderResolver};
pub use upload::{versioned_name, UploadCoordinator, UploadResult, MAX_VERSION_SUFFIX};
