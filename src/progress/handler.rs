//! Progress handler trait and events

use crate::pipeline::{NoteState, NoteStatus};
use std::path::PathBuf;
use std::time::Duration;

/// Events emitted while organizing a batch of notes
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    RunStarted { notes: usize, workers: usize },

    /// Base folder found or created
    BaseFolderReady {
        folder_id: String,
        duration: Duration,
    },

    /// A worker picked up a note
    NoteStarted {
        path: PathBuf,
        index: usize,
        total: usize,
    },

    /// A note moved to the next pipeline state
    NoteAdvanced { path: PathBuf, state: NoteState },

    /// A note reached a terminal status
    NoteFinished {
        path: PathBuf,
        index: usize,
        total: usize,
        status: NoteStatus,
        duration: Duration,
    },

    /// Dispatch stopped; `remaining` notes were not started
    Cancelled { remaining: usize },

    /// Run completed
    Completed {
        uploaded: usize,
        skipped: usize,
        failed: usize,
        total_time: Duration,
    },

    /// Run aborted before any note was processed
    Failed { error: String },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::RunStarted { notes: 2, workers: 4 });
        handler.on_progress(&ProgressEvent::NoteAdvanced {
            path: PathBuf::from("a.png"),
            state: NoteState::OcrComplete,
        });
        handler.on_progress(&ProgressEvent::Completed {
            uploaded: 2,
            skipped: 0,
            failed: 0,
            total_time: Duration::from_secs(1),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_debug() {
        let event = ProgressEvent::Cancelled { remaining: 3 };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("Cancelled"));
        assert!(debug_str.contains("remaining: 3"));
    }
}
