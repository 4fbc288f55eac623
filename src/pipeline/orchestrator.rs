//! Batch orchestration
//!
//! Each note runs through OCR, classification, folder resolution and upload
//! on a bounded pool of tokio tasks. Outcomes are stored by input index, so
//! the report keeps discovery order however tasks complete. A failing note
//! only ever affects its own report entry.

use super::config::PipelineConfig;
use super::error::{NoteError, RunError};
use super::report::{Destination, NoteOutcome, NoteState, NoteStatus, RunReport, RunSummary};
use crate::classify::{ConfidenceClassifier, Threshold};
use crate::note::{self, NoteFile, ValidationError};
use crate::ocr::{OcrEngine, OcrError};
use crate::organize::{FolderResolver, UploadCoordinator};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::store::RemoteStore;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct PipelineOrchestrator {
    ocr: Arc<dyn OcrEngine>,
    classifier: Arc<ConfidenceClassifier>,
    store: Arc<dyn RemoteStore>,
    config: PipelineConfig,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
    cancel: CancellationToken,
}

impl PipelineOrchestrator {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        classifier: Arc<ConfidenceClassifier>,
        store: Arc<dyn RemoteStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            ocr,
            classifier,
            store,
            config,
            progress_handler: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops dispatching new notes when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Organizes every note found under `inputs` into `root_id` (or the
    /// store's default root)
    pub async fn run(
        &self,
        inputs: &[PathBuf],
        threshold: f32,
        root_id: Option<&str>,
    ) -> Result<RunReport, RunError> {
        let threshold = Threshold::new(threshold)?;
        let discovered = note::discover(inputs, self.config.recursive);
        self.run_discovered(discovered, threshold, root_id).await
    }

    /// Organizes already discovered inputs; `Err` entries are reported as
    /// validation failures at their position
    pub async fn run_discovered(
        &self,
        discovered: Vec<Result<NoteFile, ValidationError>>,
        threshold: Threshold,
        root_id: Option<&str>,
    ) -> Result<RunReport, RunError> {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let root_id = root_id
            .map(str::to_string)
            .unwrap_or_else(|| self.store.default_root());
        let total = discovered.len();

        info!(
            run_id = %run_id,
            notes = total,
            threshold = threshold.value(),
            store = self.store.name(),
            root = %root_id,
            "Starting organize run"
        );
        self.emit(ProgressEvent::RunStarted {
            notes: total,
            workers: self.config.workers,
        });

        let resolver = Arc::new(FolderResolver::new(
            self.store.clone(),
            root_id.clone(),
            self.config.retry.clone(),
        ));

        if discovered.iter().any(|entry| entry.is_ok()) {
            let base_start = Instant::now();
            match resolver.base_folder().await {
                Ok(folder_id) => self.emit(ProgressEvent::BaseFolderReady {
                    folder_id,
                    duration: base_start.elapsed(),
                }),
                Err(source) => {
                    let err = RunError::StoreUnavailable {
                        store: self.store.name().to_string(),
                        source,
                    };
                    error!(error = %err, "Aborting run before processing any note");
                    self.emit(ProgressEvent::Failed {
                        error: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }

        let worker = Arc::new(NoteWorker {
            ocr: self.ocr.clone(),
            classifier: self.classifier.clone(),
            resolver: resolver.clone(),
            uploader: Arc::new(UploadCoordinator::new(
                self.store.clone(),
                self.config.retry.clone(),
            )),
            progress_handler: self.progress_handler.clone(),
            ocr_timeout: self.config.ocr_timeout,
        });

        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();
        let mut paths: Vec<PathBuf> = Vec::with_capacity(total);
        let mut outcomes: Vec<Option<NoteOutcome>> = vec![None; total];
        let mut not_started = 0usize;

        for (index, entry) in discovered.into_iter().enumerate() {
            let note = match entry {
                Ok(note) => note,
                Err(e) => {
                    paths.push(e.path().to_path_buf());
                    outcomes[index] = Some(NoteOutcome::failed(
                        e.path().to_path_buf(),
                        &NoteError::Validation(e),
                    ));
                    continue;
                }
            };
            paths.push(note.path.clone());

            let permit = if self.cancel.is_cancelled() {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    permit = semaphore.clone().acquire_owned() => permit.ok(),
                }
            };

            let Some(permit) = permit else {
                not_started += 1;
                outcomes[index] = Some(NoteOutcome::failed(note.path, &NoteError::Cancelled));
                continue;
            };

            let worker = worker.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let outcome = worker.process(note, threshold, index, total).await;
                (index, outcome)
            });
        }

        if not_started > 0 {
            self.emit(ProgressEvent::Cancelled {
                remaining: not_started,
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => error!(error = %e, "Note task aborted"),
            }
        }

        let notes: Vec<NoteOutcome> = outcomes
            .into_iter()
            .zip(paths)
            .map(|(outcome, path)| {
                outcome.unwrap_or_else(|| {
                    NoteOutcome::failed(path, &NoteError::Internal("note task aborted".to_string()))
                })
            })
            .collect();

        let summary = RunSummary::from_outcomes(&notes, resolver.folders_created());
        info!(
            run_id = %run_id,
            uploaded = summary.uploaded,
            skipped = summary.skipped,
            failed = summary.failed,
            folders_created = summary.folders_created,
            duration_ms = start.elapsed().as_millis(),
            "Organize run complete"
        );
        self.emit(ProgressEvent::Completed {
            uploaded: summary.uploaded,
            skipped: summary.skipped,
            failed: summary.failed,
            total_time: start.elapsed(),
        });

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            threshold: threshold.value(),
            root_id,
            store: self.store.name().to_string(),
            cancelled: not_started > 0,
            notes,
            summary,
        })
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("ocr", &self.ocr.name())
            .field("classifier", &self.classifier)
            .field("store", &self.store.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Everything a task needs to carry one note through the pipeline
struct NoteWorker {
    ocr: Arc<dyn OcrEngine>,
    classifier: Arc<ConfidenceClassifier>,
    resolver: Arc<FolderResolver>,
    uploader: Arc<UploadCoordinator>,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
    ocr_timeout: Duration,
}

impl NoteWorker {
    async fn process(&self, note: NoteFile, threshold: Threshold, index: usize, total: usize) -> NoteOutcome {
        let start = Instant::now();
        self.emit(ProgressEvent::NoteStarted {
            path: note.path.clone(),
            index,
            total,
        });

        let mut outcome = NoteOutcome::new(note.path.clone());
        match self.advance(&note, threshold, &mut outcome).await {
            Ok(status) => outcome.status = status,
            Err(e) => {
                warn!(path = %note.path.display(), stage = %e.stage(), error = %e, "Note failed");
                outcome.fail(&e);
            }
        }
        outcome.duration_ms = start.elapsed().as_millis() as u64;

        self.emit(ProgressEvent::NoteFinished {
            path: note.path,
            index,
            total,
            status: outcome.status,
            duration: start.elapsed(),
        });
        outcome
    }

    /// Ingested → OcrComplete → Classified → FolderResolved → Uploaded | Skipped.
    /// Fills `outcome` as stages complete so failures keep what was learned.
    async fn advance(
        &self,
        note: &NoteFile,
        threshold: Threshold,
        outcome: &mut NoteOutcome,
    ) -> Result<NoteStatus, NoteError> {
        let text = match tokio::time::timeout(self.ocr_timeout, self.ocr.extract(&note.path)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(NoteError::Ocr(OcrError::Timeout {
                    seconds: self.ocr_timeout.as_secs(),
                }))
            }
        };
        outcome.ocr_confidence = text.confidence;
        self.advanced(note, NoteState::OcrComplete);

        let classification = self.classifier.classify(&text.text, threshold).await;
        let below_threshold = classification.is_below_threshold();
        outcome.classification_error = classification.error().map(|e| e.to_string());
        let verdict = classification.into_verdict();
        debug!(
            path = %note.path.display(),
            subject = %verdict.subject,
            confidence = verdict.confidence,
            decided = verdict.decided,
            "Note classified"
        );
        outcome.verdict = Some(verdict.clone());
        self.advanced(note, NoteState::Classified);

        let folder = self
            .resolver
            .resolve(&verdict.subject)
            .await
            .map_err(NoteError::FolderResolution)?;
        outcome.destination = Some(Destination {
            folder_id: folder.folder_id.clone(),
            folder_path: folder.display_path(),
            file_id: None,
            remote_name: None,
        });
        self.advanced(note, NoteState::FolderResolved);

        let upload = self
            .uploader
            .upload(note, &folder)
            .await
            .map_err(NoteError::Upload)?;
        if let Some(destination) = outcome.destination.as_mut() {
            destination.file_id = Some(upload.file_id);
            destination.remote_name = Some(upload.remote_name);
        }

        Ok(if below_threshold {
            NoteStatus::Skipped
        } else {
            NoteStatus::Uploaded
        })
    }

    fn advanced(&self, note: &NoteFile, state: NoteState) {
        self.emit(ProgressEvent::NoteAdvanced {
            path: note.path.clone(),
            state,
        });
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }
}
