pub mod config;
pub mod error;
pub mod orchestrator;
pub mod report;

pub use config::{PipelineConfig, DEFAULT_WORKERS};
pub use error::{NoteError, RunError, Stage};
pub use orchestrator::PipelineOrchestrator;
pub use report::{
    Destination, FailureReason, NoteOutcome, NoteState, NoteStatus, RunReport, RunSummary,
};
