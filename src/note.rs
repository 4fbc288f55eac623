//! Note files and input discovery
//!
//! Inputs are files or directories. Directories are scanned for images with a
//! supported extension; files named explicitly must have one. Discovery order
//! is the order of the inputs, with each directory's images sorted by path.

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("{0} does not exist")]
    NotFound(PathBuf),

    #[error("{0} is neither a file nor a directory")]
    NotAFile(PathBuf),

    #[error("{path}: unsupported file type '{extension}' (expected one of jpg, jpeg, png, bmp, tiff, tif)")]
    Unsupported { path: PathBuf, extension: String },
}

impl ValidationError {
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::NotAFile(path) => path,
            Self::Unsupported { path, .. } => path,
        }
    }
}

/// A note image queued for organizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFile {
    /// Absolute path
    pub path: PathBuf,
    pub file_name: String,
    /// Lowercase extension without the dot
    pub extension: String,
    pub mime_type: String,
}

impl NoteFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ValidationError::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(ValidationError::NotAFile(path.to_path_buf()));
        }

        let extension = extension_of(path);
        if !is_supported(&extension) {
            return Err(ValidationError::Unsupported {
                path: path.to_path_buf(),
                extension,
            });
        }

        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            path,
            file_name,
            extension,
            mime_type,
        })
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn is_supported(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension)
}

/// Expands `inputs` into note files in discovery order.
///
/// Invalid inputs keep their position as `Err` entries so the run report can
/// list them. A file reachable through several inputs is returned once.
pub fn discover(inputs: &[PathBuf], recursive: bool) -> Vec<Result<NoteFile, ValidationError>> {
    let mut discovered = Vec::new();
    let mut seen = HashSet::new();

    for input in inputs {
        if input.is_dir() {
            for path in scan_directory(input, recursive) {
                push_unique(&mut discovered, &mut seen, NoteFile::from_path(&path));
            }
        } else {
            push_unique(&mut discovered, &mut seen, NoteFile::from_path(input));
        }
    }

    info!(
        inputs = inputs.len(),
        notes = discovered.iter().filter(|r| r.is_ok()).count(),
        invalid = discovered.iter().filter(|r| r.is_err()).count(),
        "Input discovery complete"
    );
    discovered
}

fn push_unique(
    discovered: &mut Vec<Result<NoteFile, ValidationError>>,
    seen: &mut HashSet<PathBuf>,
    entry: Result<NoteFile, ValidationError>,
) {
    if let Ok(note) = &entry {
        if !seen.insert(note.path.clone()) {
            debug!(path = %note.path.display(), "Skipping duplicate input");
            return;
        }
    }
    discovered.push(entry);
}

fn scan_directory(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for result in WalkBuilder::new(dir)
        .max_depth(if recursive { None } else { Some(1) })
        .hidden(true)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .build()
    {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        if !is_supported(&extension_of(path)) {
            debug!(path = %path.display(), "Skipping non-image file");
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    files
}
