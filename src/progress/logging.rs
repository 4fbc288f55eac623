//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use crate::pipeline::NoteStatus;
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { notes, workers } => {
                info!(notes, workers, "Starting run");
            }
            ProgressEvent::BaseFolderReady {
                folder_id,
                duration,
            } => {
                debug!(
                    folder_id = %folder_id,
                    duration_ms = duration.as_millis(),
                    "Base folder ready"
                );
            }
            ProgressEvent::NoteStarted { path, index, total } => {
                debug!(
                    path = %path.display(),
                    progress = format!("{}/{}", index + 1, total),
                    "Processing note"
                );
            }
            ProgressEvent::NoteAdvanced { path, state } => {
                debug!(path = %path.display(), state = %state, "Note advanced");
            }
            ProgressEvent::NoteFinished {
                path,
                index,
                total,
                status,
                duration,
            } => {
                let progress = format!("{}/{}", index + 1, total);
                if *status == NoteStatus::Failed {
                    warn!(
                        path = %path.display(),
                        progress,
                        duration_ms = duration.as_millis(),
                        "Note failed"
                    );
                } else {
                    info!(
                        path = %path.display(),
                        progress,
                        status = %status,
                        duration_ms = duration.as_millis(),
                        "Note finished"
                    );
                }
            }
            ProgressEvent::Cancelled { remaining } => {
                warn!(remaining, "Run cancelled, no new notes will be started");
            }
            ProgressEvent::Completed {
                uploaded,
                skipped,
                failed,
                total_time,
            } => {
                info!(
                    uploaded,
                    skipped,
                    failed,
                    total_time_ms = total_time.as_millis(),
                    "Run complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Run failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NoteState;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::RunStarted { notes: 5, workers: 2 },
            ProgressEvent::BaseFolderReady {
                folder_id: "root-1".to_string(),
                duration: Duration::from_millis(20),
            },
            ProgressEvent::NoteStarted {
                path: PathBuf::from("a.png"),
                index: 0,
                total: 5,
            },
            ProgressEvent::NoteAdvanced {
                path: PathBuf::from("a.png"),
                state: NoteState::Classified,
            },
            ProgressEvent::NoteFinished {
                path: PathBuf::from("a.png"),
                index: 0,
                total: 5,
                status: NoteStatus::Uploaded,
                duration: Duration::from_millis(40),
            },
            ProgressEvent::NoteFinished {
                path: PathBuf::from("b.png"),
                index: 1,
                total: 5,
                status: NoteStatus::Failed,
                duration: Duration::from_millis(40),
            },
            ProgressEvent::Cancelled { remaining: 3 },
            ProgressEvent::Completed {
                uploaded: 1,
                skipped: 0,
                failed: 4,
                total_time: Duration::from_secs(1),
            },
            ProgressEvent::Failed {
                error: "store unavailable".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
