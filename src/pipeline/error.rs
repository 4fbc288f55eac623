use crate::classify::InvalidThreshold;
use crate::note::ValidationError;
use crate::ocr::OcrError;
use crate::store::{RemoteErrorKind, RemoteStoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage a note failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Ocr,
    FolderResolution,
    Upload,
    Dispatch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Ocr => "ocr",
            Stage::FolderResolution => "folder_resolution",
            Stage::Upload => "upload",
            Stage::Dispatch => "dispatch",
        };
        f.write_str(name)
    }
}

/// Failure of a single note; never aborts the run
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("text extraction failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("could not resolve folder: {0}")]
    FolderResolution(#[source] RemoteStoreError),

    #[error("upload failed: {0}")]
    Upload(#[source] RemoteStoreError),

    #[error("cancelled before processing started")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl NoteError {
    pub fn stage(&self) -> Stage {
        match self {
            NoteError::Validation(_) => Stage::Validation,
            NoteError::Ocr(_) => Stage::Ocr,
            NoteError::FolderResolution(_) => Stage::FolderResolution,
            NoteError::Upload(_) => Stage::Upload,
            NoteError::Cancelled | NoteError::Internal(_) => Stage::Dispatch,
        }
    }

    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            NoteError::FolderResolution(e) | NoteError::Upload(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// Problems that stop a run before any note is processed
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    InvalidThreshold(#[from] InvalidThreshold),

    #[error("{store} store unavailable: {source}")]
    StoreUnavailable {
        store: String,
        #[source]
        source: RemoteStoreError,
    },
}
