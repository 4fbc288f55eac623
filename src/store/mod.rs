//! Remote storage abstraction
//!
//! The organizer only needs three remote operations (look up a child, create a
//! folder, upload a file). [`RemoteStore`] captures them so Google Drive, a
//! local directory and the in-memory test store can be used interchangeably.

mod drive;
mod error;
mod local;
mod memory;
mod remote;
mod retry;

pub use drive::DriveStore;
pub use error::{RemoteErrorKind, RemoteStoreError};
pub use local::{LocalStore, LOCAL_ROOT_ID};
pub use memory::{MemoryEntry, MemoryStore, StoreOp, MEMORY_ROOT_ID};
pub use remote::{EntryKind, RemoteStore, BASE_FOLDER_NAME};
pub use retry::RetryPolicy;
