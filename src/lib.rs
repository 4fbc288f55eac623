//! notefiler - sort handwritten-note scans into subject folders
//!
//! Each scanned note goes through OCR, is classified into one of a fixed set
//! of academic subjects and is uploaded into `OrganizedNotes/<subject>` on a
//! remote store. Notes the classifier is unsure about, notes with no readable
//! text and notes whose model call failed are filed under
//! `OrganizedNotes/uncategorized` instead of being dropped.
//!
//! # Core Concepts
//!
//! - **OCR engines** ([`ocr`]): turn an image into text with an optional
//!   confidence
//! - **Subject models** ([`classify`]): score text against the subject
//!   vocabulary; [`ConfidenceClassifier`] applies the confidence threshold
//! - **Remote stores** ([`store`]): Google Drive, a local directory or an
//!   in-memory store, all behind [`RemoteStore`]
//! - **Organizing** ([`organize`]): folder resolution with a per-subject
//!   cache and collision-free uploads
//! - **Pipeline** ([`pipeline`]): bounded-concurrency batch processing that
//!   produces a [`RunReport`] in input order
//!
//! # Example Usage
//!
//! ```no_run
//! use notefiler::{
//!     ConfidenceClassifier, KeywordModel, MemoryStore, MockOcr, PipelineConfig,
//!     PipelineOrchestrator, SubjectVocabulary,
//! };
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let classifier = ConfidenceClassifier::new(
//!     Arc::new(KeywordModel::new()),
//!     Arc::new(SubjectVocabulary::builtin()),
//! );
//! let orchestrator = PipelineOrchestrator::new(
//!     Arc::new(MockOcr::new().with_fallback("newton's laws of motion")),
//!     Arc::new(classifier),
//!     Arc::new(MemoryStore::new()),
//!     PipelineConfig::default(),
//! );
//!
//! let report = orchestrator
//!     .run(&[PathBuf::from("scans/")], 0.3, None)
//!     .await?;
//! println!("uploaded {} notes", report.summary.uploaded);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod note;
pub mod ocr;
pub mod organize;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod util;

pub use classify::{
    ClassificationError, ClassificationOutcome, ClassificationVerdict, ConfidenceClassifier,
    KeywordModel, LlmModel, MockModel, SubjectModel, SubjectScore, SubjectVocabulary, Threshold,
    UNCATEGORIZED,
};
pub use config::{ClassifierKind, ConfigError, NotefilerConfig, StoreKind};
pub use note::{discover, NoteFile, ValidationError, SUPPORTED_EXTENSIONS};
pub use ocr::{MockOcr, OcrEngine, OcrError, OcrText, TesseractOcr};
pub use organize::{FolderHandle, FolderResolver, UploadCoordinator, UploadResult};
pub use pipeline::{
    NoteError, NoteOutcome, NoteStatus, PipelineConfig, PipelineOrchestrator, RunError,
    RunReport, RunSummary,
};
pub use progress::{LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler};
pub use store::{
    DriveStore, LocalStore, MemoryStore, RemoteErrorKind, RemoteStore, RemoteStoreError,
    RetryPolicy, BASE_FOLDER_NAME,
};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
