//! Run report: one outcome per discovered input, in discovery order

use super::error::{NoteError, Stage};
use crate::classify::ClassificationVerdict;
use crate::store::RemoteErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of a note inside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteState {
    Ingested,
    OcrComplete,
    Classified,
    FolderResolved,
    Uploaded,
    Skipped,
    Failed,
}

impl fmt::Display for NoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoteState::Ingested => "ingested",
            NoteState::OcrComplete => "ocr_complete",
            NoteState::Classified => "classified",
            NoteState::FolderResolved => "folder_resolved",
            NoteState::Uploaded => "uploaded",
            NoteState::Skipped => "skipped",
            NoteState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal status of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    /// Filed under its subject, or under uncategorized when there was no
    /// text or the model failed
    Uploaded,
    /// Scored below the threshold; filed under uncategorized
    Skipped,
    Failed,
}

impl NoteStatus {
    pub fn as_state(self) -> NoteState {
        match self {
            NoteStatus::Uploaded => NoteState::Uploaded,
            NoteStatus::Skipped => NoteState::Skipped,
            NoteStatus::Failed => NoteState::Failed,
        }
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_state().fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_kind: Option<RemoteErrorKind>,
}

impl From<&NoteError> for FailureReason {
    fn from(error: &NoteError) -> Self {
        Self {
            stage: error.stage(),
            message: error.to_string(),
            remote_kind: error.remote_kind(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// Where a note ended up in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub folder_id: String,
    /// e.g. `OrganizedNotes/physics`
    pub folder_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteOutcome {
    pub path: PathBuf,
    pub status: NoteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ClassificationVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    /// Set when the model failed and the note fell back to uncategorized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f32>,
    pub duration_ms: u64,
}

impl NoteOutcome {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            status: NoteStatus::Failed,
            verdict: None,
            destination: None,
            failure: None,
            classification_error: None,
            ocr_confidence: None,
            duration_ms: 0,
        }
    }

    pub fn failed(path: PathBuf, error: &NoteError) -> Self {
        let mut outcome = Self::new(path);
        outcome.fail(error);
        outcome
    }

    pub fn fail(&mut self, error: &NoteError) {
        self.status = NoteStatus::Failed;
        self.failure = Some(FailureReason::from(error));
    }

    pub fn is_failed(&self) -> bool {
        self.status == NoteStatus::Failed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Filed notes per subject folder
    pub subjects: BTreeMap<String, usize>,
    /// Mean verdict confidence over notes that reached classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_confidence: Option<f32>,
    pub folders_created: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[NoteOutcome], folders_created: usize) -> Self {
        let mut summary = RunSummary {
            total: outcomes.len(),
            folders_created,
            ..Default::default()
        };
        let mut confidences = Vec::new();

        for outcome in outcomes {
            match outcome.status {
                NoteStatus::Uploaded => summary.uploaded += 1,
                NoteStatus::Skipped => summary.skipped += 1,
                NoteStatus::Failed => summary.failed += 1,
            }

            if let Some(verdict) = &outcome.verdict {
                if outcome.destination.as_ref().and_then(|d| d.file_id.as_ref()).is_some() {
                    *summary.subjects.entry(verdict.subject.clone()).or_insert(0) += 1;
                }
                confidences.push(verdict.confidence);
            }
        }

        if !confidences.is_empty() {
            summary.average_confidence =
                Some(confidences.iter().sum::<f32>() / confidences.len() as f32);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub threshold: f32,
    pub root_id: String,
    pub store: String,
    pub cancelled: bool,
    pub notes: Vec<NoteOutcome>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    pub fn with_status(&self, status: NoteStatus) -> impl Iterator<Item = &NoteOutcome> {
        self.notes.iter().filter(move |n| n.status == status)
    }
}
